//! Shared cursor/rendering surface.
//!
//! The surface is referenced by every mapper targeting the same display but
//! owned by the surrounding pipeline. Implementations serialize writes
//! internally so position updates from concurrently synthesizing devices
//! never tear.

use std::sync::Mutex;

use tracing::warn;

use crate::mapper::transform::RectF;

/// Non-owning capability interface to the cursor surface. Mappers only read
/// and write position and visibility; lifetime is managed externally.
pub trait PointerSurface: Send + Sync {
    fn position(&self) -> (f32, f32);

    /// Atomically sets the position, clamped to the surface bounds.
    fn set_position(&self, x: f32, y: f32);

    /// Atomically applies a relative move, clamped to the surface bounds,
    /// and returns the resulting position.
    fn move_by(&self, dx: f32, dy: f32) -> (f32, f32);

    fn bounds(&self) -> RectF;
    fn set_bounds(&self, bounds: RectF);

    fn is_visible(&self) -> bool;
    fn set_visible(&self, visible: bool);
}

#[derive(Debug)]
struct SurfaceState {
    x: f32,
    y: f32,
    bounds: RectF,
    visible: bool,
}

/// Mutex-serialized in-process surface implementation.
#[derive(Debug)]
pub struct SharedPointerSurface {
    state: Mutex<SurfaceState>,
}

impl SharedPointerSurface {
    pub fn new(bounds: RectF) -> Self {
        let (x, y) = bounds.clamp(
            bounds.left + bounds.width() / 2.0,
            bounds.top + bounds.height() / 2.0,
        );
        Self {
            state: Mutex::new(SurfaceState {
                x,
                y,
                bounds,
                visible: true,
            }),
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, SurfaceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Pointer surface lock poisoned, continuing with inner state");
                poisoned.into_inner()
            }
        }
    }
}

impl PointerSurface for SharedPointerSurface {
    fn position(&self) -> (f32, f32) {
        let state = self.locked();
        (state.x, state.y)
    }

    fn set_position(&self, x: f32, y: f32) {
        let mut state = self.locked();
        let (cx, cy) = state.bounds.clamp(x, y);
        state.x = cx;
        state.y = cy;
    }

    fn move_by(&self, dx: f32, dy: f32) -> (f32, f32) {
        let mut state = self.locked();
        let (cx, cy) = state.bounds.clamp(state.x + dx, state.y + dy);
        state.x = cx;
        state.y = cy;
        (cx, cy)
    }

    fn bounds(&self) -> RectF {
        self.locked().bounds
    }

    fn set_bounds(&self, bounds: RectF) {
        let mut state = self.locked();
        state.bounds = bounds;
        let (cx, cy) = bounds.clamp(state.x, state.y);
        state.x = cx;
        state.y = cy;
    }

    fn is_visible(&self) -> bool {
        self.locked().visible
    }

    fn set_visible(&self, visible: bool) {
        self.locked().visible = visible;
    }
}
