pub mod config;
pub mod device;
pub mod mapper;
pub mod pipeline;

use std::sync::Arc;

use color_eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::ReaderConfig;
use crate::device::collector::{CollectorHandle, CollectorSettings};
use crate::device::raw::CursorCapabilities;
use crate::mapper::{NotifyEvent, SharedPointerSurface};
use crate::pipeline::PipelineManager;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let reader_config = load_config();
    info!(
        "Reader configured with {} display(s), pointer speed {}",
        reader_config.displays.len(),
        reader_config.pointer.speed
    );

    // Cursor surface shared by every pointer device on the default display
    let viewport_bounds = reader_config
        .viewport(None)
        .map(|v| v.bounds)
        .unwrap_or_default();
    let surface = Arc::new(SharedPointerSurface::new(viewport_bounds));

    let (notify_sender, mut notify_receiver) = mpsc::channel(1000);
    let mut manager = PipelineManager::new(notify_sender);

    // The gamepad presents itself to the pipeline as a standard mouse
    let caps = CursorCapabilities::standard_mouse("gamepad-pointer");
    let sample_sender = manager.add_cursor_device(&caps, &reader_config, surface)?;

    let _collector_handle =
        CollectorHandle::spawn(Some(CollectorSettings::default()), sample_sender)?;

    let printer = tokio::spawn(async move {
        while let Some(event) = notify_receiver.recv().await {
            match event {
                NotifyEvent::Motion(m) => debug!(
                    "motion: pos=({:.1}, {:.1}) delta=({:.2}, {:.2}) buttons={:#x} scroll=({:.1}, {:.1})",
                    m.x, m.y, m.dx, m.dy, m.button_state, m.hscroll, m.vscroll
                ),
                NotifyEvent::Key(k) => info!(
                    "key: {:?} {:?} at {}",
                    k.direction,
                    k.action,
                    k.event_time.format("%H:%M:%S.%3f")
                ),
            }
        }
        info!("Notification channel closed");
    });

    info!("Cursor pipeline running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    manager.shutdown_all();
    printer.abort();
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn load_config() -> ReaderConfig {
    if let Err(e) = ReaderConfig::ensure_default_config() {
        warn!("Could not write default configuration: {}", e);
    }
    ReaderConfig::load_or_default()
}
