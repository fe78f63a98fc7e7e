//! Per-device processing pipelines and their lifecycle management.
//!
//! Each device gets one pipeline task owning its mapper. The [`engine`]
//! module implements the pipeline state machine; [`manager`] tracks the set
//! of live pipelines and fans configuration changes out to all of them.

pub mod engine;
pub mod manager;

pub use engine::{DevicePipeline, PipelineHandle};
pub use manager::PipelineManager;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::config::ReaderConfig;
use crate::mapper::ConfigurationChanges;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input channel closed")]
    ChannelClosed,

    #[error("Failed to send command: {0}")]
    CommandSendError(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),
}

/// Control commands delivered to a running pipeline between frames.
#[derive(Debug)]
pub enum ConfigCommand {
    /// Applies the flagged configuration categories to the mapper.
    Reconfigure {
        config: ReaderConfig,
        changes: ConfigurationChanges,
    },
    /// Clears the mapper's accumulated runtime state.
    Reset,
    /// Requests a diagnostic state dump.
    Dump(oneshot::Sender<String>),
}
