//! Translation of raw pointer/trackball hardware samples into normalized,
//! display-aware notifications.
//!
//! The core is [`CursorMapper`]: four axis accumulators merge concurrently
//! arriving samples within one sync frame, the frame synthesizer combines
//! them with the current mode, rotation/scale constants and velocity shaping,
//! and emits zero or more notifications per frame boundary.

pub mod accumulators;
pub mod cursor;
pub mod error;
pub mod params;
pub mod surface;
pub mod transform;
pub mod velocity;

// Re-exports for easier access
pub use cursor::CursorMapper;
pub use error::MapperError;
pub use params::{ConfigurationChanges, Mode, Parameters};
pub use surface::{PointerSurface, SharedPointerSurface};
pub use transform::{RectF, Rotation};

use chrono::{DateTime, Local};

use crate::config::ReaderConfig;
use crate::device::raw::RawSample;

// Source classification bits, used for scan-code state queries
pub const SOURCE_MOUSE: u32 = 1 << 1;
pub const SOURCE_MOUSE_RELATIVE: u32 = 1 << 2;
pub const SOURCE_TRACKBALL: u32 = 1 << 3;
pub const SOURCE_ANY: u32 = u32::MAX;

/// Input-source classification carried on every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Mouse,
    MouseRelative,
    Trackball,
}

impl Source {
    pub fn bits(&self) -> u32 {
        match self {
            Source::Mouse => SOURCE_MOUSE,
            Source::MouseRelative => SOURCE_MOUSE_RELATIVE,
            Source::Trackball => SOURCE_TRACKBALL,
        }
    }

    pub fn matches(&self, source_mask: u32) -> bool {
        self.bits() & source_mask != 0
    }
}

/// Display a notification targets. `Focused` is the sentinel for "whichever
/// display currently has focus"; the absence of any target (mapper-level
/// `None`) suppresses output entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayTarget {
    Display(i32),
    Focused,
}

/// Synthetic directional key emitted in navigation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

/// Tri-state answer of the scan-code introspection query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCodeState {
    Up,
    Down,
    Unknown,
}

/// One per-frame motion notification. Coordinates are display-space cursor
/// positions for pointer mode; capture and navigation modes carry deltas
/// only. The timestamp is the frame boundary's, never an individual sample's.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyMotion {
    pub display: DisplayTarget,
    pub source: Source,
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub button_state: u32,
    pub vscroll: f32,
    pub hscroll: f32,
    pub down_time: Option<DateTime<Local>>,
    pub event_time: DateTime<Local>,
}

/// Synthetic key notification for trackball navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyKey {
    pub source: Source,
    pub direction: Direction,
    pub action: KeyAction,
    pub event_time: DateTime<Local>,
}

/// Output event type of a device mapper.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyEvent {
    Motion(NotifyMotion),
    Key(NotifyKey),
}

/// Common contract of the per-device-class handlers dispatched by the owning
/// pipeline. `CursorMapper` is the pointer/trackball variant; sibling device
/// classes implement the same seam.
pub trait DeviceMapper: Send {
    /// Source classification this mapper currently reports.
    fn source(&self) -> Source;

    /// Feeds one raw sample; a frame-boundary sample triggers synthesis and
    /// returns the frame's notifications.
    fn process(&mut self, sample: &RawSample) -> Vec<NotifyEvent>;

    /// Clears accumulator and runtime state. Device parameters and
    /// display-derived state survive.
    fn reset(&mut self, when: DateTime<Local>);

    /// Applies the flagged configuration-change categories.
    fn reconfigure(
        &mut self,
        when: DateTime<Local>,
        config: &ReaderConfig,
        changes: ConfigurationChanges,
    ) -> Vec<NotifyEvent>;

    /// Side-effect-free state serialization for diagnostics.
    fn dump(&self) -> String;
}
