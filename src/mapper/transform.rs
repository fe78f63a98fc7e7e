//! Display rotation and absolute-range remapping for raw pointer samples.

use serde::{Deserialize, Serialize};

/// Logical display bounds in float pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl RectF {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Clamps a point into the bounds.
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x.clamp(self.left, self.right),
            y.clamp(self.top, self.bottom),
        )
    }
}

impl Default for RectF {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// Display rotation in right-angle steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Rotates a delta or point around the origin. Composing four
    /// applications of the same step yields the original vector.
    pub fn rotate(&self, x: f32, y: f32) -> (f32, f32) {
        match self {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (y, -x),
            Rotation::Deg180 => (-x, -y),
            Rotation::Deg270 => (-y, x),
        }
    }

    pub fn rotate_i32(&self, x: i32, y: i32) -> (i32, i32) {
        match self {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (y, -x),
            Rotation::Deg180 => (-x, -y),
            Rotation::Deg270 => (-y, x),
        }
    }

    pub fn inverse(&self) -> Rotation {
        match self {
            Rotation::Deg0 => Rotation::Deg0,
            Rotation::Deg90 => Rotation::Deg270,
            Rotation::Deg180 => Rotation::Deg180,
            Rotation::Deg270 => Rotation::Deg90,
        }
    }
}

/// Remaps an absolute device sample into logical display bounds. The device
/// span is inclusive, so a value at `min` maps to the left/top edge and a
/// value at `min + span - 1` maps to the right/bottom edge.
pub fn remap_absolute(value: i32, device_min: i32, device_span: i32, out_min: f32, out_len: f32) -> f32 {
    if device_span <= 1 {
        return out_min;
    }
    let normalized = (value - device_min) as f32 / (device_span - 1) as f32;
    out_min + normalized.clamp(0.0, 1.0) * out_len
}
