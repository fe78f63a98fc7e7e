//! Per-axis accumulators that merge same-frame raw samples into one coherent
//! value for the frame synthesizer to drain.

use tracing::debug;

use crate::device::raw::{
    AbsAxisInfo, CursorCapabilities, RawAxis, ScrollAxis, BTN_BACK, BTN_FORWARD, BTN_LEFT,
    BTN_MIDDLE, BTN_RIGHT,
};

// Button mask bits carried on motion notifications
pub const BUTTON_PRIMARY: u32 = 1 << 0;
pub const BUTTON_SECONDARY: u32 = 1 << 1;
pub const BUTTON_TERTIARY: u32 = 1 << 2;
pub const BUTTON_BACK: u32 = 1 << 3;
pub const BUTTON_FORWARD: u32 = 1 << 4;

/// Sums relative motion samples within one frame.
///
/// `finish_sync` only marks the frame complete; the storage is cleared lazily
/// when the next sample arrives, never mid-frame. A drained accumulator reads
/// as zero until new samples come in, so a frame without motion can never
/// re-deliver the previous frame's delta. `reset` clears immediately and is
/// only called on detach/reattach or full mapper reset.
#[derive(Debug, Default)]
pub struct MotionAccumulator {
    rel_x: i32,
    rel_y: i32,
    synced: bool,
}

impl MotionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, axis: RawAxis, delta: i32) {
        if self.synced {
            self.clear_relative_axes();
            self.synced = false;
        }
        match axis {
            RawAxis::X => self.rel_x += delta,
            RawAxis::Y => self.rel_y += delta,
        }
    }

    pub fn relative_x(&self) -> i32 {
        if self.synced {
            0
        } else {
            self.rel_x
        }
    }

    pub fn relative_y(&self) -> i32 {
        if self.synced {
            0
        } else {
            self.rel_y
        }
    }

    pub fn finish_sync(&mut self) {
        self.synced = true;
    }

    pub fn reset(&mut self) {
        debug!("Resetting motion accumulator");
        self.clear_relative_axes();
        self.synced = false;
    }

    fn clear_relative_axes(&mut self) {
        self.rel_x = 0;
        self.rel_y = 0;
    }
}

/// Tracks absolute position samples and their per-frame delta.
#[derive(Debug, Default)]
pub struct PositionAccumulator {
    x: i32,
    y: i32,
    prev_x: i32,
    prev_y: i32,
    delta_x: i32,
    delta_y: i32,
    min_abs_x: i32,
    min_abs_y: i32,
    max_abs_x: i32,
    max_abs_y: i32,
    has_abs_x: bool,
    has_abs_y: bool,
    moved: bool,
}

impl PositionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspects the device's absolute-axis descriptors. Must run before the
    /// first sample and again whenever capability data changes.
    pub fn configure(&mut self, caps: &CursorCapabilities) {
        self.has_abs_x = caps.abs_x.is_some();
        self.has_abs_y = caps.abs_y.is_some();
        let AbsAxisInfo { min, max } = caps.abs_x.unwrap_or(AbsAxisInfo { min: 0, max: 0 });
        self.min_abs_x = min;
        self.max_abs_x = max;
        let AbsAxisInfo { min, max } = caps.abs_y.unwrap_or(AbsAxisInfo { min: 0, max: 0 });
        self.min_abs_y = min;
        self.max_abs_y = max;
        debug!(
            "Position accumulator configured: x={}..{} ({}), y={}..{} ({})",
            self.min_abs_x, self.max_abs_x, self.has_abs_x, self.min_abs_y, self.max_abs_y,
            self.has_abs_y
        );
    }

    pub fn process(&mut self, axis: RawAxis, value: i32) {
        match axis {
            RawAxis::X => {
                self.x = value;
                self.delta_x = self.x - self.prev_x;
                if self.x != self.prev_x {
                    self.moved = true;
                }
            }
            RawAxis::Y => {
                self.y = value;
                self.delta_y = self.y - self.prev_y;
                if self.y != self.prev_y {
                    self.moved = true;
                }
            }
        }
    }

    /// Commits the current value as the baseline for next-frame deltas and
    /// clears the moved flag. This is the authoritative frame-boundary clear,
    /// called once per completed frame whether or not samples arrived.
    pub fn finish_sync(&mut self) {
        self.prev_x = self.x;
        self.prev_y = self.y;
        self.delta_x = 0;
        self.delta_y = 0;
        self.moved = false;
    }

    pub fn reset(&mut self) {
        debug!("Resetting position accumulator");
        self.x = 0;
        self.y = 0;
        self.prev_x = 0;
        self.prev_y = 0;
        self.delta_x = 0;
        self.delta_y = 0;
        self.moved = false;
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn delta_x(&self) -> i32 {
        self.delta_x
    }

    pub fn delta_y(&self) -> i32 {
        self.delta_y
    }

    pub fn min_abs_x(&self) -> i32 {
        self.min_abs_x
    }

    pub fn min_abs_y(&self) -> i32 {
        self.min_abs_y
    }

    /// Inclusive span of the X axis range.
    pub fn span_abs_x(&self) -> i32 {
        1 + (self.max_abs_x - self.min_abs_x)
    }

    pub fn span_abs_y(&self) -> i32 {
        1 + (self.max_abs_y - self.min_abs_y)
    }

    pub fn is_supported(&self) -> bool {
        self.has_abs_x
            && self.has_abs_y
            && self.max_abs_x > 0
            && self.max_abs_y > 0
            && self.span_abs_x() > 0
            && self.span_abs_y() > 0
    }

    pub fn has_moved(&self) -> bool {
        self.is_supported() && self.moved
    }
}

/// Tracks pointer button state from scan-code samples and exposes it as a
/// button bitmask. Button state persists across frames; only `reset` clears.
#[derive(Debug, Default)]
pub struct ButtonAccumulator {
    btn_left: bool,
    btn_right: bool,
    btn_middle: bool,
    btn_back: bool,
    btn_forward: bool,
}

impl ButtonAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, scan_code: u16, pressed: bool) {
        match scan_code {
            BTN_LEFT => self.btn_left = pressed,
            BTN_RIGHT => self.btn_right = pressed,
            BTN_MIDDLE => self.btn_middle = pressed,
            BTN_BACK => self.btn_back = pressed,
            BTN_FORWARD => self.btn_forward = pressed,
            other => debug!("Ignoring unknown button scan code: {:#x}", other),
        }
    }

    pub fn button_state(&self) -> u32 {
        let mut state = 0;
        if self.btn_left {
            state |= BUTTON_PRIMARY;
        }
        if self.btn_right {
            state |= BUTTON_SECONDARY;
        }
        if self.btn_middle {
            state |= BUTTON_TERTIARY;
        }
        if self.btn_back {
            state |= BUTTON_BACK;
        }
        if self.btn_forward {
            state |= BUTTON_FORWARD;
        }
        state
    }

    pub fn finish_sync(&mut self) {
        // Buttons are level state, not deltas; nothing drains per frame.
    }

    pub fn reset(&mut self) {
        debug!("Resetting button accumulator");
        self.btn_left = false;
        self.btn_right = false;
        self.btn_middle = false;
        self.btn_back = false;
        self.btn_forward = false;
    }
}

/// Sums scroll wheel ticks within one frame; drained on the frame boundary.
#[derive(Debug, Default)]
pub struct ScrollAccumulator {
    rel_wheel: i32,
    rel_hwheel: i32,
}

impl ScrollAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, axis: ScrollAxis, ticks: i32) {
        match axis {
            ScrollAxis::Vertical => self.rel_wheel += ticks,
            ScrollAxis::Horizontal => self.rel_hwheel += ticks,
        }
    }

    pub fn vertical(&self) -> i32 {
        self.rel_wheel
    }

    pub fn horizontal(&self) -> i32 {
        self.rel_hwheel
    }

    pub fn finish_sync(&mut self) {
        self.rel_wheel = 0;
        self.rel_hwheel = 0;
    }

    pub fn reset(&mut self) {
        self.finish_sync();
    }
}
