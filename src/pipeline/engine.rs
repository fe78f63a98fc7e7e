//! Device pipeline state machine.
//!
//! One pipeline per device: it owns the device's mapper, pulls raw samples
//! from the collector, and forwards synthesized notifications downstream.
//! Configuration commands arrive on a separate channel and are applied
//! between frames, never mid-frame.

use statum::{machine, state};
use tokio::{
    select,
    sync::{mpsc, oneshot},
    time::Instant,
};
use tracing::{debug, error, info, warn};

use crate::device::raw::RawSample;
use crate::mapper::{DeviceMapper, NotifyEvent};
use crate::pipeline::{ConfigCommand, PipelineError};

/// Throughput counters, logged periodically.
#[derive(Default)]
struct PipelineMetrics {
    samples_processed: usize,
    events_emitted: usize,
    events_dropped: usize,
}

/// Outcome of waiting on the two input channels.
enum PipelineInput {
    Sample(RawSample),
    Command(ConfigCommand),
    Closed,
}

impl PipelineInput {
    fn from_sample(sample: Option<RawSample>) -> Self {
        match sample {
            Some(sample) => Self::Sample(sample),
            None => Self::Closed,
        }
    }

    fn from_command(command: Option<ConfigCommand>) -> Self {
        match command {
            Some(command) => Self::Command(command),
            None => Self::Closed,
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum PipelineState {
    Initializing,
    Ready,
    Processing(RawSample),
}

#[machine]
pub struct DevicePipeline<S: PipelineState> {
    device_name: String,

    // Raw samples from the collector
    sample_receiver: mpsc::Receiver<RawSample>,

    // Reconfigure/reset commands from the owning manager
    command_receiver: mpsc::Receiver<ConfigCommand>,

    // Synthesized notifications towards the application
    notify_sender: mpsc::Sender<NotifyEvent>,

    mapper: Box<dyn DeviceMapper>,

    metrics: PipelineMetrics,

    log_interval_seconds: u64,

    last_log_time: Instant,
}

impl<S: PipelineState> DevicePipeline<S> {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    fn log_metrics_if_due(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_log_time).as_secs() >= self.log_interval_seconds {
            info!(
                "Pipeline '{}': {} samples processed, {} events emitted, {} dropped",
                self.device_name,
                self.metrics.samples_processed,
                self.metrics.events_emitted,
                self.metrics.events_dropped
            );
            self.metrics = PipelineMetrics::default();
            self.last_log_time = now;
        }
    }

    fn apply_command(&mut self, command: ConfigCommand) {
        match command {
            ConfigCommand::Reconfigure { config, changes } => {
                debug!(
                    "Pipeline '{}': applying reconfiguration {:?}",
                    self.device_name, changes
                );
                let events = self
                    .mapper
                    .reconfigure(chrono::Local::now(), &config, changes);
                for event in events {
                    self.forward(event);
                }
            }
            ConfigCommand::Reset => {
                info!("Pipeline '{}': resetting mapper", self.device_name);
                self.mapper.reset(chrono::Local::now());
            }
            ConfigCommand::Dump(reply) => {
                if reply.send(self.mapper.dump()).is_err() {
                    debug!("Pipeline '{}': dump requester went away", self.device_name);
                }
            }
        }
    }

    fn forward(&mut self, event: NotifyEvent) {
        match self.notify_sender.try_send(event) {
            Ok(_) => self.metrics.events_emitted += 1,
            Err(e) => {
                if matches!(e, tokio::sync::mpsc::error::TrySendError::Full(_)) {
                    warn!(
                        "Pipeline '{}': notification channel full, event dropped",
                        self.device_name
                    );
                    self.metrics.events_dropped += 1;
                } else {
                    error!(
                        "Pipeline '{}': failed to send notification: {}",
                        self.device_name, e
                    );
                }
            }
        }
    }
}

impl DevicePipeline<Initializing> {
    pub fn create(
        device_name: String,
        sample_receiver: mpsc::Receiver<RawSample>,
        command_receiver: mpsc::Receiver<ConfigCommand>,
        notify_sender: mpsc::Sender<NotifyEvent>,
        mapper: Box<dyn DeviceMapper>,
    ) -> Self {
        Self::new(
            device_name,
            sample_receiver,
            command_receiver,
            notify_sender,
            mapper,
            PipelineMetrics::default(),
            30, // log interval in seconds
            Instant::now(),
        )
    }

    pub fn initialize(self) -> DevicePipeline<Ready> {
        info!("Initializing pipeline for device '{}'", self.device_name);
        self.transition()
    }
}

impl DevicePipeline<Ready> {
    /// Waits for the next sample or command. Commands are applied in place;
    /// a sample moves the pipeline into the Processing state.
    pub async fn wait_for_sample(
        mut self,
    ) -> Result<DevicePipeline<Processing>, (Self, PipelineError)> {
        loop {
            self.log_metrics_if_due();
            let next = {
                let sample_receiver = &mut self.sample_receiver;
                let command_receiver = &mut self.command_receiver;
                select! {
                    sample = sample_receiver.recv() => PipelineInput::from_sample(sample),
                    command = command_receiver.recv() => PipelineInput::from_command(command),
                }
            };
            match next {
                PipelineInput::Sample(sample) => return Ok(self.transition_with(sample)),
                PipelineInput::Command(command) => self.apply_command(command),
                PipelineInput::Closed => {
                    error!("Pipeline '{}': input channel closed", self.device_name);
                    return Err((self, PipelineError::ChannelClosed));
                }
            }
        }
    }
}

impl DevicePipeline<Processing> {
    /// Feeds the pending sample through the mapper and forwards whatever the
    /// frame synthesizer produced.
    pub fn process_sample(mut self) -> DevicePipeline<Ready> {
        let sample = self.get_state_data().cloned();
        let sample = match sample {
            Some(sample) => sample,
            None => {
                warn!("Pipeline '{}': no sample in Processing state", self.device_name);
                return self.transition();
            }
        };

        self.metrics.samples_processed += 1;
        let events = self.mapper.process(&sample);
        for event in events {
            self.forward(event);
        }

        self.transition()
    }
}

/// Pipeline main loop. Runs until shutdown is requested or a channel closes.
pub async fn run_pipeline(
    mut pipeline: DevicePipeline<Ready>,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), PipelineError> {
    info!(
        "Starting pipeline main loop for device '{}'",
        pipeline.device_name()
    );

    loop {
        select! {
            result = pipeline.wait_for_sample() => {
                match result {
                    Ok(processing) => {
                        pipeline = processing.process_sample();
                    }
                    Err((_, err)) => {
                        error!("Pipeline terminating: {}", err);
                        return Err(err);
                    }
                }
            },
            _ = &mut shutdown => {
                info!("Pipeline shutdown requested");
                return Ok(());
            }
        }
    }
}

/// Handle for one spawned device pipeline.
pub struct PipelineHandle {
    device_name: String,
    sample_sender: mpsc::Sender<RawSample>,
    command_sender: mpsc::Sender<ConfigCommand>,
    shutdown_sender: Option<oneshot::Sender<()>>,
}

impl PipelineHandle {
    /// Spawns a pipeline task around an existing mapper and returns the
    /// handle controlling it.
    pub fn spawn(
        device_name: &str,
        mapper: Box<dyn DeviceMapper>,
        notify_sender: mpsc::Sender<NotifyEvent>,
    ) -> Self {
        info!("Spawning pipeline for device '{}'", device_name);

        let (sample_sender, sample_receiver) = mpsc::channel(1000);
        let (command_sender, command_receiver) = mpsc::channel(16);
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let pipeline = DevicePipeline::create(
            device_name.to_string(),
            sample_receiver,
            command_receiver,
            notify_sender,
            mapper,
        );

        tokio::spawn(async move {
            let pipeline = pipeline.initialize();
            if let Err(e) = run_pipeline(pipeline, shutdown_receiver).await {
                error!("Pipeline task terminated with error: {}", e);
            } else {
                info!("Pipeline task terminated");
            }
        });

        Self {
            device_name: device_name.to_string(),
            sample_sender,
            command_sender,
            shutdown_sender: Some(shutdown_sender),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Sender the collector uses to feed this device's samples.
    pub fn sample_sender(&self) -> mpsc::Sender<RawSample> {
        self.sample_sender.clone()
    }

    pub async fn send_command(&self, command: ConfigCommand) -> Result<(), PipelineError> {
        self.command_sender
            .send(command)
            .await
            .map_err(|e| PipelineError::CommandSendError(e.to_string()))
    }

    /// Requests a state dump from the running mapper.
    pub async fn dump(&self) -> Result<String, PipelineError> {
        let (reply_sender, reply_receiver) = oneshot::channel();
        self.send_command(ConfigCommand::Dump(reply_sender)).await?;
        reply_receiver
            .await
            .map_err(|e| PipelineError::CommandSendError(e.to_string()))
    }

    /// Signals the pipeline task to stop. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(sender) = self.shutdown_sender.take() {
            if sender.send(()).is_err() {
                debug!("Pipeline '{}' already stopped", self.device_name);
            }
        }
    }
}
