use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// Linux-style scan codes for pointer buttons
pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;
pub const BTN_BACK: u16 = 0x113;
pub const BTN_FORWARD: u16 = 0x114;

// Relative pointer axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawAxis {
    X,
    Y,
}

// Scroll wheel axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrollAxis {
    Vertical,
    Horizontal,
}

// One raw hardware sample. FrameSync marks the end of one hardware report;
// everything between two syncs belongs to the same frame.
#[derive(Debug, Clone)]
pub enum RawSampleKind {
    RelativeMove { axis: RawAxis, delta: i32 },
    AbsolutePosition { axis: RawAxis, value: i32 },
    ButtonChange { scan_code: u16, pressed: bool },
    ScrollTick { axis: ScrollAxis, ticks: i32 },
    FrameSync,
}

#[derive(Debug, Clone)]
pub struct RawSample {
    pub kind: RawSampleKind,
    pub timestamp: DateTime<Local>,
}

impl RawSample {
    pub fn new(kind: RawSampleKind, timestamp: DateTime<Local>) -> Self {
        Self { kind, timestamp }
    }
}

/// Observed range of one absolute axis as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsAxisInfo {
    pub min: i32,
    pub max: i32,
}

/// Capability descriptor produced by device probing. Consumed exactly once
/// when a mapper is constructed; a capability change requires a fresh mapper.
#[derive(Debug, Clone)]
pub struct CursorCapabilities {
    pub name: String,
    pub has_relative_x: bool,
    pub has_relative_y: bool,
    pub abs_x: Option<AbsAxisInfo>,
    pub abs_y: Option<AbsAxisInfo>,
    pub scan_codes: Vec<u16>,
    pub has_associated_display: bool,
    pub orientation_aware: bool,
    /// Trackball-style relative-only device that should synthesize
    /// directional key events instead of moving an on-screen cursor.
    pub trackball_like: bool,
}

impl CursorCapabilities {
    /// A plain relative mouse with three buttons tied to a display.
    pub fn standard_mouse(name: &str) -> Self {
        Self {
            name: name.to_string(),
            has_relative_x: true,
            has_relative_y: true,
            abs_x: None,
            abs_y: None,
            scan_codes: vec![BTN_LEFT, BTN_RIGHT, BTN_MIDDLE],
            has_associated_display: true,
            orientation_aware: true,
            trackball_like: false,
        }
    }

    /// A relative-only trackball with no display association.
    pub fn trackball(name: &str) -> Self {
        Self {
            name: name.to_string(),
            has_relative_x: true,
            has_relative_y: true,
            abs_x: None,
            abs_y: None,
            scan_codes: vec![BTN_LEFT],
            has_associated_display: false,
            orientation_aware: false,
            trackball_like: true,
        }
    }

    /// An absolute-position device (drawing tablet used as a pointer).
    pub fn absolute_tablet(name: &str, x: AbsAxisInfo, y: AbsAxisInfo) -> Self {
        Self {
            name: name.to_string(),
            has_relative_x: false,
            has_relative_y: false,
            abs_x: Some(x),
            abs_y: Some(y),
            scan_codes: vec![BTN_LEFT, BTN_RIGHT],
            has_associated_display: true,
            orientation_aware: true,
            trackball_like: false,
        }
    }
}
