//! Raw sample collection from gamepad hardware via gilrs.
//!
//! Bridges a physical controller to the cursor pipeline: the left stick is
//! treated as a relative pointer device, the right stick as a scroll wheel,
//! and the face/shoulder buttons as pointer buttons. Samples are grouped into
//! frames, each batch closed by a FrameSync sample.

use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::device::raw::{
    RawAxis, RawSample, RawSampleKind, ScrollAxis, BTN_BACK, BTN_FORWARD, BTN_LEFT, BTN_MIDDLE,
    BTN_RIGHT,
};

/// Collector settings.
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    /// Analog stick deadzone as a fraction (0.0-1.0).
    pub stick_deadzone: f32,
    /// Raw device units produced per poll tick at full stick deflection.
    pub motion_gain: f32,
    /// Right-stick deflection that produces one scroll tick per poll.
    pub scroll_threshold: f32,
    /// Poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            stick_deadzone: 0.05,
            motion_gain: 12.0,
            scroll_threshold: 0.5,
            poll_interval_ms: 8,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send sample: {0}")]
    SampleSendError(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct SampleCollector<S: CollectionState> {
    gilrs: Gilrs,

    active_gamepad: Option<GamepadId>,

    settings: CollectorSettings,

    // Channel towards the device pipeline
    sample_sender: mpsc::Sender<RawSample>,

    // Current deflection of the pointer stick, post-deadzone
    stick_x: f32,
    stick_y: f32,

    // Current deflection of the scroll stick, post-deadzone
    scroll_x: f32,
    scroll_y: f32,

    // Sub-unit motion left over from rounding to integer device units
    motion_carry_x: f32,
    motion_carry_y: f32,

    // Button transitions waiting for the next frame
    pending_buttons: Vec<RawSampleKind>,
}

impl<S: CollectionState> SampleCollector<S> {
    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }
}

impl SampleCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        sample_sender: mpsc::Sender<RawSample>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating sample collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(
            gilrs,
            None,
            settings,
            sample_sender,
            0.0, // stick_x
            0.0, // stick_y
            0.0, // scroll_x
            0.0, // scroll_y
            0.0, // motion_carry_x
            0.0, // motion_carry_y
            Vec::new(),
        ))
    }

    pub fn initialize(mut self) -> Result<SampleCollector<Collecting>, CollectorError> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, continuing in idle mode");
        } else {
            info!("Found {} gamepads:", gamepads.len());
            for (idx, (id, gamepad)) in gamepads.iter().enumerate() {
                info!("  [{}] ID: {}, Name: {}", idx, id, gamepad.name());
            }
            let (id, gamepad) = &gamepads[0];
            self.active_gamepad = Some(*id);
            info!("Selected gamepad: {} ({})", gamepad.name(), id);
        }

        info!("Sample collector initialized, transitioning to Collecting state");
        Ok(self.transition())
    }
}

impl SampleCollector<Collecting> {
    /// Drains pending hardware events, synthesizes this tick's samples, and
    /// sends them as one frame. Returns the number of samples sent.
    pub fn collect_tick(&mut self) -> Result<usize, CollectorError> {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if let Some(active_id) = self.active_gamepad {
                if id != active_id {
                    debug!("Skipping event from non-active gamepad: {:?}", id);
                    continue;
                }
            }
            self.apply_gilrs_event(event);
        }

        let mut batch = Vec::new();
        let now = Local::now();

        // Stick deflection becomes a stream of relative moves, one pair per
        // poll tick while deflected. Fractional units carry to the next tick.
        let wanted_x = self.stick_x * self.settings.motion_gain + self.motion_carry_x;
        // Stick up is positive in gilrs; pointer up is negative y
        let wanted_y = -self.stick_y * self.settings.motion_gain + self.motion_carry_y;
        let delta_x = wanted_x.trunc() as i32;
        let delta_y = wanted_y.trunc() as i32;
        self.motion_carry_x = wanted_x - delta_x as f32;
        self.motion_carry_y = wanted_y - delta_y as f32;
        if delta_x != 0 {
            batch.push(RawSampleKind::RelativeMove {
                axis: RawAxis::X,
                delta: delta_x,
            });
        }
        if delta_y != 0 {
            batch.push(RawSampleKind::RelativeMove {
                axis: RawAxis::Y,
                delta: delta_y,
            });
        }

        if self.scroll_y.abs() >= self.settings.scroll_threshold {
            batch.push(RawSampleKind::ScrollTick {
                axis: ScrollAxis::Vertical,
                ticks: if self.scroll_y > 0.0 { 1 } else { -1 },
            });
        }
        if self.scroll_x.abs() >= self.settings.scroll_threshold {
            batch.push(RawSampleKind::ScrollTick {
                axis: ScrollAxis::Horizontal,
                ticks: if self.scroll_x > 0.0 { 1 } else { -1 },
            });
        }

        batch.extend(self.pending_buttons.drain(..));

        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len() + 1;
        for kind in batch {
            self.send_sample(RawSample::new(kind, now))?;
        }
        self.send_sample(RawSample::new(RawSampleKind::FrameSync, now))?;
        debug!("Sent frame with {} samples", count);
        Ok(count)
    }

    fn send_sample(&self, sample: RawSample) -> Result<(), CollectorError> {
        self.sample_sender
            .try_send(sample)
            .map_err(|e| CollectorError::SampleSendError(e.to_string()))
    }

    fn apply_gilrs_event(&mut self, event: EventType) {
        match event {
            EventType::AxisChanged(axis, value, _) => {
                let value = apply_deadzone(value, self.settings.stick_deadzone);
                match axis {
                    Axis::LeftStickX => self.stick_x = value,
                    Axis::LeftStickY => self.stick_y = value,
                    Axis::RightStickX => self.scroll_x = value,
                    Axis::RightStickY => self.scroll_y = value,
                    _ => debug!("Ignoring unsupported axis: {:?}", axis),
                }
            }
            EventType::ButtonPressed(button, _) => {
                if let Some(scan_code) = map_button(button) {
                    info!("Button pressed: {:?} -> {:#x}", button, scan_code);
                    self.pending_buttons.push(RawSampleKind::ButtonChange {
                        scan_code,
                        pressed: true,
                    });
                }
            }
            EventType::ButtonReleased(button, _) => {
                if let Some(scan_code) = map_button(button) {
                    info!("Button released: {:?} -> {:#x}", button, scan_code);
                    self.pending_buttons.push(RawSampleKind::ButtonChange {
                        scan_code,
                        pressed: false,
                    });
                }
            }
            EventType::Connected => {
                info!("Controller connected event detected");
            }
            EventType::Disconnected => {
                warn!("Controller disconnected event detected");
            }
            _ => debug!("Unhandled event type: {:?}", event),
        }
    }
}

/// Public interface for spawning and running the collector.
pub struct CollectorHandle {
    sample_sender: mpsc::Sender<RawSample>,
}

impl CollectorHandle {
    pub fn spawn(
        settings: Option<CollectorSettings>,
        sample_sender: mpsc::Sender<RawSample>,
    ) -> Result<Self, CollectorError> {
        info!("Spawning sample collector with settings: {:?}", settings);

        let sender_clone = sample_sender.clone();
        let collector = SampleCollector::create(settings, sample_sender)?;
        let poll_interval = Duration::from_millis(collector.settings().poll_interval_ms);

        tokio::spawn(async move {
            match collector.initialize() {
                Ok(mut collecting) => {
                    info!("Sample collector initialized, starting collection loop");
                    loop {
                        if let Err(e) = collecting.collect_tick() {
                            // Back off on a full channel instead of dropping out
                            warn!("Sample delivery failed: {}", e);
                        }
                        tokio::time::sleep(poll_interval).await;
                    }
                }
                Err(e) => {
                    error!("Failed to initialize sample collector: {}", e);
                }
            }
        });

        info!("Sample collector successfully started");
        Ok(Self {
            sample_sender: sender_clone,
        })
    }

    pub fn sample_sender(&self) -> mpsc::Sender<RawSample> {
        self.sample_sender.clone()
    }
}

// Maps gamepad buttons onto pointer button scan codes
fn map_button(button: Button) -> Option<u16> {
    match button {
        Button::South => Some(BTN_LEFT),
        Button::East => Some(BTN_RIGHT),
        Button::North => Some(BTN_MIDDLE),
        Button::LeftTrigger => Some(BTN_BACK),
        Button::RightTrigger => Some(BTN_FORWARD),
        _ => None,
    }
}

fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        sign * (value.abs() - deadzone) / (1.0 - deadzone)
    }
}
