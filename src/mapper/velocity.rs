//! Velocity shaping (pointer ballistics) strategies.
//!
//! Two interchangeable strategies are selected at construction time and never
//! switched mid-session: the legacy linear ramp and the curved ballistics
//! profile. Wheel motion always uses the simple strategy, with independent
//! histories for the vertical and horizontal axes so that wheel smoothing
//! never contaminates pointer smoothing.

use chrono::{DateTime, Duration, Local};
use std::collections::VecDeque;
use std::fmt::Debug;
use tracing::debug;

/// Sliding window over which movement speed is estimated.
const SPEED_WINDOW_MS: i64 = 100;

/// Tuning constants for one velocity shaper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityParameters {
    /// Base multiplier applied before acceleration.
    pub scale: f32,
    /// Speed (px/s) below which no acceleration is applied.
    pub low_threshold: f32,
    /// Speed (px/s) at and above which full acceleration is applied.
    pub high_threshold: f32,
    /// Gain at and above the high threshold.
    pub acceleration: f32,
}

impl VelocityParameters {
    /// Derives pointer parameters from the user speed setting (-7..=7).
    /// Each step scales base sensitivity by 1.4x.
    pub fn for_pointer_speed(speed: i32, low_threshold: f32, high_threshold: f32, acceleration: f32) -> Self {
        let clamped = speed.clamp(-7, 7);
        Self {
            scale: 1.4_f32.powi(clamped),
            low_threshold,
            high_threshold,
            acceleration,
        }
    }

    /// Fixed parameters for scroll wheel smoothing.
    pub fn wheel() -> Self {
        Self {
            scale: 1.0,
            low_threshold: 15.0,
            high_threshold: 50.0,
            acceleration: 4.0,
        }
    }
}

impl Default for VelocityParameters {
    fn default() -> Self {
        Self {
            scale: 1.0,
            low_threshold: 500.0,
            high_threshold: 3000.0,
            acceleration: 3.0,
        }
    }
}

/// Converts a raw per-frame delta into a perceptually scaled one.
///
/// Implementations must be monotonic in input magnitude for a fixed elapsed
/// time and must return an exactly zero delta when no time has elapsed since
/// the previous frame (duplicate timestamps).
pub trait VelocityShaper: Send + Debug {
    fn shape(&mut self, when: DateTime<Local>, dx: f32, dy: f32) -> (f32, f32);
    fn set_parameters(&mut self, params: VelocityParameters);
    fn parameters(&self) -> VelocityParameters;
    fn reset(&mut self);
}

/// Movement history shared by both shaping strategies.
#[derive(Debug, Default)]
struct MovementHistory {
    entries: VecDeque<(DateTime<Local>, f32)>,
    last_time: Option<DateTime<Local>>,
}

impl MovementHistory {
    /// Records one movement and returns the estimated speed in px/s, or None
    /// when no time has elapsed since the previous movement.
    fn record(&mut self, when: DateTime<Local>, magnitude: f32) -> Option<f32> {
        if self.last_time == Some(when) {
            return None;
        }
        self.last_time = Some(when);
        self.entries.push_back((when, magnitude));

        let horizon = when - Duration::milliseconds(SPEED_WINDOW_MS);
        while let Some(&(t, _)) = self.entries.front() {
            if t < horizon && self.entries.len() > 1 {
                self.entries.pop_front();
            } else {
                break;
            }
        }

        let (oldest, _) = *self.entries.front()?;
        let span = when - oldest;
        let span_secs = span.num_microseconds()? as f32 / 1_000_000.0;
        if span_secs <= 0.0 {
            return Some(0.0);
        }
        let distance: f32 = self.entries.iter().map(|(_, m)| m).sum();
        Some(distance / span_secs)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.last_time = None;
    }
}

/// Legacy strategy: linear gain ramp between the two speed thresholds.
#[derive(Debug, Default)]
pub struct SimpleVelocityShaper {
    params: VelocityParameters,
    history: MovementHistory,
}

impl SimpleVelocityShaper {
    pub fn new(params: VelocityParameters) -> Self {
        Self {
            params,
            history: MovementHistory::default(),
        }
    }

    fn gain(&self, speed: f32) -> f32 {
        let p = &self.params;
        if speed <= p.low_threshold {
            1.0
        } else if speed >= p.high_threshold {
            p.acceleration
        } else {
            let t = (speed - p.low_threshold) / (p.high_threshold - p.low_threshold);
            1.0 + (p.acceleration - 1.0) * t
        }
    }
}

impl VelocityShaper for SimpleVelocityShaper {
    fn shape(&mut self, when: DateTime<Local>, dx: f32, dy: f32) -> (f32, f32) {
        let magnitude = (dx * dx + dy * dy).sqrt();
        match self.history.record(when, magnitude) {
            Some(speed) => {
                let factor = self.params.scale * self.gain(speed);
                (dx * factor, dy * factor)
            }
            None => (0.0, 0.0),
        }
    }

    fn set_parameters(&mut self, params: VelocityParameters) {
        debug!("Simple shaper parameters updated: {:?}", params);
        self.params = params;
    }

    fn parameters(&self) -> VelocityParameters {
        self.params
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

/// New ballistics strategy: smoothstep gain curve between the thresholds,
/// avoiding the gain discontinuity of the linear ramp at the knee points.
#[derive(Debug, Default)]
pub struct CurvedVelocityShaper {
    params: VelocityParameters,
    history: MovementHistory,
}

impl CurvedVelocityShaper {
    pub fn new(params: VelocityParameters) -> Self {
        Self {
            params,
            history: MovementHistory::default(),
        }
    }

    fn gain(&self, speed: f32) -> f32 {
        let p = &self.params;
        let t = ((speed - p.low_threshold) / (p.high_threshold - p.low_threshold)).clamp(0.0, 1.0);
        let smooth = t * t * (3.0 - 2.0 * t);
        1.0 + (p.acceleration - 1.0) * smooth
    }
}

impl VelocityShaper for CurvedVelocityShaper {
    fn shape(&mut self, when: DateTime<Local>, dx: f32, dy: f32) -> (f32, f32) {
        let magnitude = (dx * dx + dy * dy).sqrt();
        match self.history.record(when, magnitude) {
            Some(speed) => {
                let factor = self.params.scale * self.gain(speed);
                (dx * factor, dy * factor)
            }
            None => (0.0, 0.0),
        }
    }

    fn set_parameters(&mut self, params: VelocityParameters) {
        debug!("Curved shaper parameters updated: {:?}", params);
        self.params = params;
    }

    fn parameters(&self) -> VelocityParameters {
        self.params
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

/// Selects the pointer shaping strategy. The choice is fixed for the lifetime
/// of the mapper.
pub fn make_pointer_shaper(curved_ballistics: bool, params: VelocityParameters) -> Box<dyn VelocityShaper> {
    if curved_ballistics {
        Box::new(CurvedVelocityShaper::new(params))
    } else {
        Box::new(SimpleVelocityShaper::new(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Local> {
        Local.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn shaped_x(shaper: &mut dyn VelocityShaper, ms: i64, dx: f32) -> f32 {
        shaper.shape(t(ms), dx, 0.0).0
    }

    #[test]
    fn zero_elapsed_time_yields_zero_output() {
        for curved in [false, true] {
            let mut shaper = make_pointer_shaper(curved, VelocityParameters::default());
            shaped_x(shaper.as_mut(), 0, 5.0);
            // duplicate timestamp must short-circuit, not divide by zero
            assert_eq!(shaper.shape(t(0), 5.0, 0.0), (0.0, 0.0));
        }
    }

    #[test]
    fn output_is_monotonic_in_input_magnitude() {
        for curved in [false, true] {
            let params = VelocityParameters {
                scale: 1.0,
                low_threshold: 10.0,
                high_threshold: 200.0,
                acceleration: 3.0,
            };
            let mut previous = 0.0;
            for raw in [1.0_f32, 2.0, 4.0, 8.0, 16.0, 32.0] {
                // fresh shaper per probe so history does not couple the runs
                let mut shaper = make_pointer_shaper(curved, params);
                shaped_x(shaper.as_mut(), 0, raw);
                let shaped = shaped_x(shaper.as_mut(), 10, raw);
                assert!(
                    shaped >= previous,
                    "curved={} raw={} shaped={} previous={}",
                    curved,
                    raw,
                    shaped,
                    previous
                );
                previous = shaped;
            }
        }
    }

    #[test]
    fn slow_movement_passes_through_at_base_scale() {
        let mut shaper = SimpleVelocityShaper::new(VelocityParameters {
            scale: 2.0,
            low_threshold: 1000.0,
            high_threshold: 5000.0,
            acceleration: 3.0,
        });
        shaped_x(&mut shaper, 0, 1.0);
        // 1px in 100ms = 10px/s, far below the low threshold
        let shaped = shaped_x(&mut shaper, 100, 1.0);
        assert!((shaped - 2.0).abs() < 1e-5);
    }

    #[test]
    fn fast_movement_hits_full_acceleration() {
        let mut shaper = SimpleVelocityShaper::new(VelocityParameters {
            scale: 1.0,
            low_threshold: 10.0,
            high_threshold: 100.0,
            acceleration: 4.0,
        });
        shaped_x(&mut shaper, 0, 50.0);
        // 50px in 10ms = 5000px/s, far above the high threshold
        let shaped = shaped_x(&mut shaper, 10, 50.0);
        assert!((shaped - 200.0).abs() < 1e-3);
    }

    #[test]
    fn reset_discards_speed_history() {
        let params = VelocityParameters {
            scale: 1.0,
            low_threshold: 10.0,
            high_threshold: 100.0,
            acceleration: 4.0,
        };
        let mut shaper = SimpleVelocityShaper::new(params);
        let first = shaped_x(&mut shaper, 0, 40.0);

        shaped_x(&mut shaper, 5, 40.0);
        shaped_x(&mut shaper, 10, 40.0);
        shaper.reset();

        // after reset the same first burst must shape identically
        let again = shaped_x(&mut shaper, 1000, 40.0);
        assert!((first - again).abs() < 1e-5);
    }

    #[test]
    fn pointer_speed_setting_scales_exponentially() {
        let slow = VelocityParameters::for_pointer_speed(-7, 500.0, 3000.0, 3.0);
        let neutral = VelocityParameters::for_pointer_speed(0, 500.0, 3000.0, 3.0);
        let fast = VelocityParameters::for_pointer_speed(7, 500.0, 3000.0, 3.0);
        assert!(slow.scale < neutral.scale);
        assert!((neutral.scale - 1.0).abs() < 1e-6);
        assert!(fast.scale > neutral.scale);
        // out-of-range settings clamp instead of overflowing
        let clamped = VelocityParameters::for_pointer_speed(99, 500.0, 3000.0, 3.0);
        assert_eq!(clamped.scale, fast.scale);
    }
}
