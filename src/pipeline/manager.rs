//! Tracks the set of live device pipelines and fans configuration changes
//! out to all of them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::ReaderConfig;
use crate::device::raw::{CursorCapabilities, RawSample};
use crate::mapper::{
    ConfigurationChanges, CursorMapper, MapperError, NotifyEvent, PointerSurface,
};
use crate::pipeline::{ConfigCommand, PipelineError, PipelineHandle};

pub struct PipelineManager {
    pipelines: HashMap<String, PipelineHandle>,
    notify_sender: mpsc::Sender<NotifyEvent>,
}

impl PipelineManager {
    pub fn new(notify_sender: mpsc::Sender<NotifyEvent>) -> Self {
        Self {
            pipelines: HashMap::new(),
            notify_sender,
        }
    }

    /// Builds a cursor mapper for the probed device and spawns its pipeline.
    /// Returns the sender the collector feeds this device's samples into.
    pub fn add_cursor_device(
        &mut self,
        caps: &CursorCapabilities,
        config: &ReaderConfig,
        surface: Arc<dyn PointerSurface>,
    ) -> Result<mpsc::Sender<RawSample>, MapperError> {
        let has_relative = caps.has_relative_x || caps.has_relative_y;
        let has_absolute = caps.abs_x.is_some() && caps.abs_y.is_some();
        if !has_relative && !has_absolute {
            return Err(MapperError::UnsupportedCapability(format!(
                "device '{}' reports no pointer axes",
                caps.name
            )));
        }

        if self.pipelines.contains_key(&caps.name) {
            warn!("Replacing existing pipeline for device '{}'", caps.name);
            self.remove_device(&caps.name);
        }

        let mapper = Box::new(CursorMapper::new(caps, config, surface));
        let handle = PipelineHandle::spawn(&caps.name, mapper, self.notify_sender.clone());
        let sample_sender = handle.sample_sender();
        self.pipelines.insert(caps.name.clone(), handle);
        info!(
            "Added device '{}' ({} pipelines active)",
            caps.name,
            self.pipelines.len()
        );
        Ok(sample_sender)
    }

    pub fn remove_device(&mut self, name: &str) {
        match self.pipelines.remove(name) {
            Some(mut handle) => {
                handle.shutdown();
                info!("Removed device '{}'", name);
            }
            None => warn!("Attempted to remove unknown device '{}'", name),
        }
    }

    pub fn device_names(&self) -> Vec<&str> {
        self.pipelines.keys().map(String::as_str).collect()
    }

    /// Broadcasts a configuration change to every live pipeline.
    pub async fn reconfigure_all(
        &self,
        config: &ReaderConfig,
        changes: ConfigurationChanges,
    ) -> Result<(), PipelineError> {
        for handle in self.pipelines.values() {
            handle
                .send_command(ConfigCommand::Reconfigure {
                    config: config.clone(),
                    changes,
                })
                .await?;
        }
        Ok(())
    }

    pub async fn reset_all(&self) -> Result<(), PipelineError> {
        for handle in self.pipelines.values() {
            handle.send_command(ConfigCommand::Reset).await?;
        }
        Ok(())
    }

    /// Collects diagnostic dumps from every pipeline.
    pub async fn dump_all(&self) -> Result<String, PipelineError> {
        let mut out = String::new();
        for handle in self.pipelines.values() {
            out.push_str(&handle.dump().await?);
            out.push('\n');
        }
        Ok(out)
    }

    pub async fn dump_device(&self, name: &str) -> Result<String, PipelineError> {
        match self.pipelines.get(name) {
            Some(handle) => handle.dump().await,
            None => Err(PipelineError::UnknownDevice(name.to_string())),
        }
    }

    pub fn shutdown_all(&mut self) {
        for (name, handle) in self.pipelines.iter_mut() {
            info!("Shutting down pipeline '{}'", name);
            handle.shutdown();
        }
        self.pipelines.clear();
    }
}
