//! Cursor input mapper: the pointer/trackball device-class handler.
//!
//! Merges raw per-axis samples through the four accumulators, and on every
//! frame boundary runs the synthesis state machine: resolve the current mode,
//! rotate and scale the merged delta, apply velocity shaping, update the
//! shared cursor surface, and emit zero or more notifications.
//!
//! ```text
//! RawSample ──► [Motion|Position|Button|Scroll Accumulator]
//!                         │ (FrameSync)
//!                         ▼
//!             rotate/scale ──► velocity shape ──► notifications
//!                         │
//!                         ▼
//!                  PointerSurface (pointer mode only)
//! ```

use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::device::raw::{
    CursorCapabilities, RawSample, RawSampleKind, BTN_BACK, BTN_FORWARD, BTN_LEFT, BTN_MIDDLE,
    BTN_RIGHT,
};
use crate::mapper::accumulators::{
    ButtonAccumulator, MotionAccumulator, PositionAccumulator, ScrollAccumulator, BUTTON_BACK,
    BUTTON_FORWARD, BUTTON_PRIMARY, BUTTON_SECONDARY, BUTTON_TERTIARY,
};
use crate::mapper::params::{ConfigurationChanges, Mode, Parameters};
use crate::mapper::surface::PointerSurface;
use crate::mapper::transform::{remap_absolute, RectF, Rotation};
use crate::mapper::velocity::{
    make_pointer_shaper, SimpleVelocityShaper, VelocityParameters, VelocityShaper,
};
use crate::mapper::{
    DeviceMapper, Direction, DisplayTarget, KeyAction, NotifyEvent, NotifyKey, NotifyMotion,
    ScanCodeState, Source,
};

/// Amount a trackball needs to move along one axis to generate a key event.
pub const TRACKBALL_MOVEMENT_THRESHOLD: i32 = 6;

/// Per-frame synthesis phase. Driven by the sample stream: any accumulating
/// sample leaves Idle, the FrameSync sample runs synthesis and returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Idle,
    Accumulating,
    Synthesizing,
}

pub struct CursorMapper {
    device_name: String,
    // Pointer button scan codes the device advertises
    scan_codes: Vec<u16>,
    parameters: Parameters,
    // Effective mode; mutated only by the reconfigure path
    current_mode: Mode,
    source: Source,

    motion: MotionAccumulator,
    position: PositionAccumulator,
    buttons: ButtonAccumulator,
    scroll: ScrollAccumulator,

    x_scale: f32,
    y_scale: f32,
    x_precision: f32,
    y_precision: f32,
    abs_x_scale: f32,
    abs_y_scale: f32,
    v_wheel_scale: f32,
    h_wheel_scale: f32,

    pointer_shaper: Box<dyn VelocityShaper>,
    // Wheel histories are kept separate so wheel smoothing never
    // contaminates pointer smoothing, and per axis to avoid cross-axis
    // artifacts.
    wheel_x_shaper: SimpleVelocityShaper,
    wheel_y_shaper: SimpleVelocityShaper,

    display_target: Option<DisplayTarget>,
    orientation: Rotation,
    bounds: RectF,
    surface: Arc<dyn PointerSurface>,

    button_state: u32,
    down_time: Option<DateTime<Local>>,
    last_event_time: Option<DateTime<Local>>,

    // Navigation carry, deliberately preserved across frames
    nav_accum_x: i32,
    nav_accum_y: i32,

    frame_state: FrameState,
}

impl CursorMapper {
    pub fn new(
        caps: &CursorCapabilities,
        config: &ReaderConfig,
        surface: Arc<dyn PointerSurface>,
    ) -> Self {
        let parameters = Parameters::compute(caps);
        info!(
            "Creating cursor mapper for '{}' in {} mode",
            caps.name, parameters.mode
        );

        let mut position = PositionAccumulator::new();
        position.configure(caps);

        let (x_scale, x_precision) = match parameters.mode {
            Mode::Navigation => (
                1.0 / TRACKBALL_MOVEMENT_THRESHOLD as f32,
                TRACKBALL_MOVEMENT_THRESHOLD as f32,
            ),
            _ => (1.0, 1.0),
        };
        let source = match parameters.mode {
            Mode::Navigation => Source::Trackball,
            _ => Source::Mouse,
        };

        let pointer_params = VelocityParameters::for_pointer_speed(
            config.pointer.speed,
            config.pointer.gain_low_speed,
            config.pointer.gain_high_speed,
            config.pointer.acceleration,
        );

        let mut mapper = Self {
            device_name: caps.name.clone(),
            scan_codes: caps.scan_codes.clone(),
            parameters,
            current_mode: parameters.mode,
            source,
            motion: MotionAccumulator::new(),
            position,
            buttons: ButtonAccumulator::new(),
            scroll: ScrollAccumulator::new(),
            x_scale,
            y_scale: x_scale,
            x_precision,
            y_precision: x_precision,
            abs_x_scale: 1.0,
            abs_y_scale: 1.0,
            v_wheel_scale: config.pointer.wheel_scale,
            h_wheel_scale: config.pointer.wheel_scale,
            pointer_shaper: make_pointer_shaper(config.pointer.curved_ballistics, pointer_params),
            wheel_x_shaper: SimpleVelocityShaper::new(VelocityParameters::wheel()),
            wheel_y_shaper: SimpleVelocityShaper::new(VelocityParameters::wheel()),
            display_target: None,
            orientation: Rotation::Deg0,
            bounds: RectF::default(),
            surface,
            button_state: 0,
            down_time: None,
            last_event_time: None,
            nav_accum_x: 0,
            nav_accum_y: 0,
            frame_state: FrameState::Idle,
        };
        mapper.reconfigure(Local::now(), config, ConfigurationChanges::all());
        mapper
    }

    pub fn parameters(&self) -> Parameters {
        self.parameters
    }

    pub fn current_mode(&self) -> Mode {
        self.current_mode
    }

    pub fn associated_display(&self) -> Option<DisplayTarget> {
        self.display_target
    }

    /// Navigation carry retained across frames, in raw device units.
    pub fn navigation_carry(&self) -> (i32, i32) {
        (self.nav_accum_x, self.nav_accum_y)
    }

    /// Tri-state button query against the current bitmask, filtered by the
    /// caller's source-capability mask. Pure; part of introspection, not of
    /// the synthesis path.
    pub fn scan_code_state(&self, source_mask: u32, scan_code: u16) -> ScanCodeState {
        if !self.source.matches(source_mask) {
            return ScanCodeState::Unknown;
        }
        if !self.scan_codes.contains(&scan_code) {
            return ScanCodeState::Unknown;
        }
        let bit = match scan_code {
            BTN_LEFT => BUTTON_PRIMARY,
            BTN_RIGHT => BUTTON_SECONDARY,
            BTN_MIDDLE => BUTTON_TERTIARY,
            BTN_BACK => BUTTON_BACK,
            BTN_FORWARD => BUTTON_FORWARD,
            _ => return ScanCodeState::Unknown,
        };
        if self.button_state & bit != 0 {
            ScanCodeState::Down
        } else {
            ScanCodeState::Up
        }
    }

    fn configure_on_pointer_capture(&mut self, config: &ReaderConfig) {
        // Capture only applies to devices resolved as pointers at probe time
        if self.parameters.mode != Mode::Pointer {
            return;
        }
        let wanted = if config.pointer.capture {
            Mode::PointerRelative
        } else {
            Mode::Pointer
        };
        if wanted == self.current_mode {
            return;
        }
        info!(
            "'{}': pointer capture {} ({} -> {})",
            self.device_name,
            if config.pointer.capture { "enabled" } else { "disabled" },
            self.current_mode,
            wanted
        );
        self.current_mode = wanted;
        self.source = match wanted {
            Mode::PointerRelative => Source::MouseRelative,
            _ => Source::Mouse,
        };
        // Coordinate semantics change across the capture boundary; stale
        // smoothing state must not carry over. Wheel histories are untouched.
        self.pointer_shaper.reset();
    }

    fn configure_on_pointer_speed(&mut self, config: &ReaderConfig) {
        let params = VelocityParameters::for_pointer_speed(
            config.pointer.speed,
            config.pointer.gain_low_speed,
            config.pointer.gain_high_speed,
            config.pointer.acceleration,
        );
        debug!(
            "'{}': pointer speed {} -> {:?}",
            self.device_name, config.pointer.speed, params
        );
        self.pointer_shaper.set_parameters(params);
    }

    fn configure_on_display_info(&mut self, config: &ReaderConfig) {
        if !self.parameters.has_associated_display {
            // Trackball output targets whichever display has focus
            self.display_target = Some(DisplayTarget::Focused);
            return;
        }
        match config.viewport(None) {
            Some(viewport) => {
                self.display_target = Some(DisplayTarget::Display(viewport.display_id));
                self.orientation = if self.parameters.orientation_aware {
                    viewport.rotation
                } else {
                    Rotation::Deg0
                };
                self.bounds = viewport.bounds;
                self.surface.set_bounds(viewport.bounds);
                if self.position.is_supported() {
                    self.abs_x_scale = viewport.bounds.width() / self.position.span_abs_x() as f32;
                    self.abs_y_scale = viewport.bounds.height() / self.position.span_abs_y() as f32;
                }
                debug!(
                    "'{}': display {} bounds {:?} rotation {:?}",
                    self.device_name, viewport.display_id, self.bounds, self.orientation
                );
            }
            None => {
                warn!(
                    "'{}': no display viewport available, suppressing motion output",
                    self.device_name
                );
                self.display_target = None;
            }
        }
    }

    /// Frame synthesis, run once per FrameSync sample.
    fn sync(&mut self, when: DateTime<Local>) -> Vec<NotifyEvent> {
        self.frame_state = FrameState::Synthesizing;
        let mut out = Vec::new();

        let last_buttons = self.button_state;
        let new_buttons = self.buttons.button_state();
        self.button_state = new_buttons;
        let buttons_changed = new_buttons != last_buttons;
        if last_buttons == 0 && new_buttons != 0 {
            // First press from zero state; held until all buttons release
            self.down_time = Some(when);
        }

        match self.current_mode {
            Mode::Pointer | Mode::PointerRelative => {
                self.synthesize_pointer(when, buttons_changed, &mut out)
            }
            Mode::Navigation => self.synthesize_navigation(when, buttons_changed, &mut out),
        }

        // Drain every accumulator exactly once per frame, emitted or not
        self.motion.finish_sync();
        self.position.finish_sync();
        self.buttons.finish_sync();
        self.scroll.finish_sync();
        self.last_event_time = Some(when);
        self.frame_state = FrameState::Idle;
        out
    }

    fn synthesize_pointer(
        &mut self,
        when: DateTime<Local>,
        buttons_changed: bool,
        out: &mut Vec<NotifyEvent>,
    ) {
        let use_absolute = self.position.is_supported();
        let moved;
        let mut dx;
        let mut dy;
        let mut abs_target = None;

        if use_absolute {
            moved = self.position.has_moved();
            let (nx, ny) = self.normalized_absolute();
            let (rx, ry) = rotate_normalized(self.orientation, nx, ny);
            abs_target = Some((
                self.bounds.left + rx * self.bounds.width(),
                self.bounds.top + ry * self.bounds.height(),
            ));
            let raw_dx = self.position.delta_x() as f32 * self.abs_x_scale;
            let raw_dy = self.position.delta_y() as f32 * self.abs_y_scale;
            let rotated = self.orientation.rotate(raw_dx, raw_dy);
            dx = rotated.0;
            dy = rotated.1;
        } else {
            let raw_dx = self.motion.relative_x() as f32 * self.x_scale;
            let raw_dy = self.motion.relative_y() as f32 * self.y_scale;
            let rotated = self.orientation.rotate(raw_dx, raw_dy);
            dx = rotated.0;
            dy = rotated.1;
            moved = dx != 0.0 || dy != 0.0;
            if moved {
                let shaped = self.pointer_shaper.shape(when, dx, dy);
                dx = shaped.0;
                dy = shaped.1;
            }
        }

        let mut vscroll = self.scroll.vertical() as f32 * self.v_wheel_scale;
        let mut hscroll = self.scroll.horizontal() as f32 * self.h_wheel_scale;
        if vscroll != 0.0 {
            vscroll = self.wheel_y_shaper.shape(when, vscroll, 0.0).0;
        }
        if hscroll != 0.0 {
            hscroll = self.wheel_x_shaper.shape(when, hscroll, 0.0).0;
        }

        let target = match self.display_target {
            Some(target) => target,
            None => {
                // Defined degraded mode: frames drain, nothing is emitted
                debug!("'{}': motion suppressed, no target display", self.device_name);
                return;
            }
        };

        let (x, y) = if self.current_mode == Mode::Pointer {
            if let Some((ax, ay)) = abs_target.filter(|_| moved) {
                self.surface.set_position(ax, ay);
                self.surface.position()
            } else if moved {
                self.surface.move_by(dx, dy)
            } else {
                self.surface.position()
            }
        } else {
            // Capture mode never moves the visible cursor
            (0.0, 0.0)
        };

        if moved || buttons_changed || vscroll != 0.0 || hscroll != 0.0 {
            out.push(NotifyEvent::Motion(NotifyMotion {
                display: target,
                source: self.source,
                x,
                y,
                dx,
                dy,
                button_state: self.button_state,
                vscroll,
                hscroll,
                down_time: self.down_time,
                event_time: when,
            }));
        }
    }

    fn synthesize_navigation(
        &mut self,
        when: DateTime<Local>,
        buttons_changed: bool,
        out: &mut Vec<NotifyEvent>,
    ) {
        self.nav_accum_x += self.motion.relative_x();
        self.nav_accum_y += self.motion.relative_y();

        // Each full threshold along an axis becomes one key pair; the
        // remainder carries into the next frame. Terminates because every
        // iteration strictly decreases the remaining accumulation.
        while self.nav_accum_x >= TRACKBALL_MOVEMENT_THRESHOLD {
            self.push_key_pair(Direction::Right, when, out);
            self.nav_accum_x -= TRACKBALL_MOVEMENT_THRESHOLD;
        }
        while self.nav_accum_x <= -TRACKBALL_MOVEMENT_THRESHOLD {
            self.push_key_pair(Direction::Left, when, out);
            self.nav_accum_x += TRACKBALL_MOVEMENT_THRESHOLD;
        }
        while self.nav_accum_y >= TRACKBALL_MOVEMENT_THRESHOLD {
            self.push_key_pair(Direction::Down, when, out);
            self.nav_accum_y -= TRACKBALL_MOVEMENT_THRESHOLD;
        }
        while self.nav_accum_y <= -TRACKBALL_MOVEMENT_THRESHOLD {
            self.push_key_pair(Direction::Up, when, out);
            self.nav_accum_y += TRACKBALL_MOVEMENT_THRESHOLD;
        }

        // Button changes emit independently of motion
        if buttons_changed {
            out.push(NotifyEvent::Motion(NotifyMotion {
                display: self.display_target.unwrap_or(DisplayTarget::Focused),
                source: self.source,
                x: 0.0,
                y: 0.0,
                dx: 0.0,
                dy: 0.0,
                button_state: self.button_state,
                vscroll: 0.0,
                hscroll: 0.0,
                down_time: self.down_time,
                event_time: when,
            }));
        }
    }

    fn push_key_pair(&self, direction: Direction, when: DateTime<Local>, out: &mut Vec<NotifyEvent>) {
        debug!("'{}': synthesizing {:?} key pair", self.device_name, direction);
        out.push(NotifyEvent::Key(NotifyKey {
            source: self.source,
            direction,
            action: KeyAction::Down,
            event_time: when,
        }));
        out.push(NotifyEvent::Key(NotifyKey {
            source: self.source,
            direction,
            action: KeyAction::Up,
            event_time: when,
        }));
    }

    fn normalized_absolute(&self) -> (f32, f32) {
        let nx = remap_absolute(
            self.position.x(),
            self.position.min_abs_x(),
            self.position.span_abs_x(),
            0.0,
            1.0,
        );
        let ny = remap_absolute(
            self.position.y(),
            self.position.min_abs_y(),
            self.position.span_abs_y(),
            0.0,
            1.0,
        );
        (nx, ny)
    }
}

/// Rotates a point within the unit square by right-angle steps. Four
/// applications return the original point.
fn rotate_normalized(rotation: Rotation, nx: f32, ny: f32) -> (f32, f32) {
    match rotation {
        Rotation::Deg0 => (nx, ny),
        Rotation::Deg90 => (ny, 1.0 - nx),
        Rotation::Deg180 => (1.0 - nx, 1.0 - ny),
        Rotation::Deg270 => (1.0 - ny, nx),
    }
}

impl DeviceMapper for CursorMapper {
    fn source(&self) -> Source {
        self.source
    }

    fn process(&mut self, sample: &RawSample) -> Vec<NotifyEvent> {
        match sample.kind {
            RawSampleKind::RelativeMove { axis, delta } => {
                self.frame_state = FrameState::Accumulating;
                self.motion.process(axis, delta);
                Vec::new()
            }
            RawSampleKind::AbsolutePosition { axis, value } => {
                self.frame_state = FrameState::Accumulating;
                self.position.process(axis, value);
                Vec::new()
            }
            RawSampleKind::ButtonChange { scan_code, pressed } => {
                self.frame_state = FrameState::Accumulating;
                self.buttons.process(scan_code, pressed);
                Vec::new()
            }
            RawSampleKind::ScrollTick { axis, ticks } => {
                self.frame_state = FrameState::Accumulating;
                self.scroll.process(axis, ticks);
                Vec::new()
            }
            RawSampleKind::FrameSync => self.sync(sample.timestamp),
        }
    }

    fn reset(&mut self, when: DateTime<Local>) {
        info!("'{}': resetting mapper state at {}", self.device_name, when);
        self.motion.reset();
        self.position.reset();
        self.buttons.reset();
        self.scroll.reset();
        self.pointer_shaper.reset();
        self.wheel_x_shaper.reset();
        self.wheel_y_shaper.reset();
        self.button_state = 0;
        self.down_time = None;
        self.last_event_time = None;
        self.nav_accum_x = 0;
        self.nav_accum_y = 0;
        self.frame_state = FrameState::Idle;
        // Parameters and display/rotation state survive; only reconfigure
        // re-derives them.
    }

    fn reconfigure(
        &mut self,
        _when: DateTime<Local>,
        config: &ReaderConfig,
        changes: ConfigurationChanges,
    ) -> Vec<NotifyEvent> {
        if changes.pointer_capture {
            self.configure_on_pointer_capture(config);
        }
        if changes.pointer_speed {
            self.configure_on_pointer_speed(config);
        }
        if changes.display_info {
            self.configure_on_display_info(config);
        }
        Vec::new()
    }

    fn dump(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "Cursor Input Mapper: {}", self.device_name);
        let _ = writeln!(
            s,
            "  mode={} (probed {}), source={:?}",
            self.current_mode, self.parameters.mode, self.source
        );
        let _ = writeln!(
            s,
            "  associated_display={}, orientation_aware={}",
            self.parameters.has_associated_display, self.parameters.orientation_aware
        );
        let _ = writeln!(s, "  display_target={:?}", self.display_target);
        let _ = writeln!(
            s,
            "  orientation={:?}, bounds={:?}",
            self.orientation, self.bounds
        );
        let _ = writeln!(
            s,
            "  scale=({}, {}), precision=({}, {}), abs_scale=({}, {})",
            self.x_scale,
            self.y_scale,
            self.x_precision,
            self.y_precision,
            self.abs_x_scale,
            self.abs_y_scale
        );
        let _ = writeln!(
            s,
            "  wheel_scale=({}, {})",
            self.h_wheel_scale, self.v_wheel_scale
        );
        let _ = writeln!(
            s,
            "  button_state={:#x}, down_time={:?}, last_event_time={:?}",
            self.button_state, self.down_time, self.last_event_time
        );
        let _ = writeln!(
            s,
            "  nav_carry=({}, {}), frame_state={:?}",
            self.nav_accum_x, self.nav_accum_y, self.frame_state
        );
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisplayViewport, ReaderConfig};
    use crate::device::raw::{AbsAxisInfo, RawAxis, ScrollAxis};
    use crate::mapper::surface::SharedPointerSurface;
    use crate::mapper::{SOURCE_ANY, SOURCE_TRACKBALL};
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Local> {
        Local.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn test_config() -> ReaderConfig {
        let mut config = ReaderConfig::with_defaults();
        config.displays = vec![DisplayViewport {
            display_id: 0,
            bounds: RectF::new(0.0, 0.0, 1000.0, 1000.0),
            rotation: Rotation::Deg0,
        }];
        config.default_display = Some(0);
        config
    }

    fn mouse_setup() -> (CursorMapper, Arc<SharedPointerSurface>, ReaderConfig) {
        let config = test_config();
        let surface = Arc::new(SharedPointerSurface::new(RectF::new(
            0.0, 0.0, 1000.0, 1000.0,
        )));
        let mapper = CursorMapper::new(
            &CursorCapabilities::standard_mouse("test-mouse"),
            &config,
            surface.clone(),
        );
        (mapper, surface, config)
    }

    fn trackball_setup() -> CursorMapper {
        let config = test_config();
        let surface = Arc::new(SharedPointerSurface::new(RectF::new(
            0.0, 0.0, 1000.0, 1000.0,
        )));
        CursorMapper::new(&CursorCapabilities::trackball("test-ball"), &config, surface)
    }

    fn rel(axis: RawAxis, delta: i32, ms: i64) -> RawSample {
        RawSample::new(RawSampleKind::RelativeMove { axis, delta }, t(ms))
    }

    fn sync_at(ms: i64) -> RawSample {
        RawSample::new(RawSampleKind::FrameSync, t(ms))
    }

    fn button(scan_code: u16, pressed: bool, ms: i64) -> RawSample {
        RawSample::new(RawSampleKind::ButtonChange { scan_code, pressed }, t(ms))
    }

    #[test]
    fn pointer_motion_moves_cursor_and_emits_one_notification() {
        let (mut mapper, surface, _) = mouse_setup();
        // neutral speed, first frame: gain 1 so shaped delta equals raw
        assert!(mapper.process(&rel(RawAxis::X, 5, 0)).is_empty());
        let events = mapper.process(&sync_at(0));
        assert_eq!(events.len(), 1);
        match &events[0] {
            NotifyEvent::Motion(m) => {
                assert_eq!(m.source, Source::Mouse);
                assert_eq!(m.display, DisplayTarget::Display(0));
                assert!((m.dx - 5.0).abs() < 1e-5);
                assert_eq!(m.dy, 0.0);
                // surface started centered at (500, 500)
                assert!((m.x - 505.0).abs() < 1e-5);
                assert!((m.y - 500.0).abs() < 1e-5);
                assert_eq!(m.event_time, t(0));
            }
            other => panic!("expected motion, got {:?}", other),
        }
        assert_eq!(surface.position(), (505.0, 500.0));
    }

    #[test]
    fn pointer_motion_is_clamped_to_display_bounds() {
        let (mut mapper, surface, _) = mouse_setup();
        surface.set_position(998.0, 500.0);
        mapper.process(&rel(RawAxis::X, 50, 0));
        let events = mapper.process(&sync_at(0));
        match &events[0] {
            NotifyEvent::Motion(m) => assert_eq!(m.x, 1000.0),
            other => panic!("expected motion, got {:?}", other),
        }
        assert_eq!(surface.position(), (1000.0, 500.0));
    }

    #[test]
    fn empty_frame_emits_nothing_but_still_drains() {
        let (mut mapper, _, _) = mouse_setup();
        assert!(mapper.process(&sync_at(0)).is_empty());
        // motion from a previous frame must not leak into a later one
        mapper.process(&rel(RawAxis::X, 5, 10));
        mapper.process(&sync_at(10));
        let events = mapper.process(&sync_at(20));
        assert!(events.is_empty());
    }

    #[test]
    fn multiple_samples_merge_into_one_frame_delta() {
        let (mut mapper, _, _) = mouse_setup();
        mapper.process(&rel(RawAxis::X, 3, 0));
        mapper.process(&rel(RawAxis::Y, -2, 0));
        mapper.process(&rel(RawAxis::X, 4, 0));
        let events = mapper.process(&sync_at(0));
        match &events[0] {
            NotifyEvent::Motion(m) => {
                assert!((m.dx - 7.0).abs() < 1e-5);
                assert!((m.dy + 2.0).abs() < 1e-5);
            }
            other => panic!("expected motion, got {:?}", other),
        }
    }

    #[test]
    fn button_press_sets_down_time_and_emits() {
        let (mut mapper, _, _) = mouse_setup();
        mapper.process(&button(BTN_LEFT, true, 5));
        let events = mapper.process(&sync_at(5));
        match &events[0] {
            NotifyEvent::Motion(m) => {
                assert_eq!(m.button_state, BUTTON_PRIMARY);
                assert_eq!(m.down_time, Some(t(5)));
            }
            other => panic!("expected motion, got {:?}", other),
        }

        // down-time survives while the button is held
        mapper.process(&button(BTN_RIGHT, true, 20));
        let events = mapper.process(&sync_at(20));
        match &events[0] {
            NotifyEvent::Motion(m) => {
                assert_eq!(m.button_state, BUTTON_PRIMARY | BUTTON_SECONDARY);
                assert_eq!(m.down_time, Some(t(5)));
            }
            other => panic!("expected motion, got {:?}", other),
        }
    }

    #[test]
    fn scroll_ticks_are_scaled_and_drained() {
        let (mut mapper, _, _) = mouse_setup();
        mapper.process(&RawSample::new(
            RawSampleKind::ScrollTick {
                axis: ScrollAxis::Vertical,
                ticks: 2,
            },
            t(0),
        ));
        let events = mapper.process(&sync_at(0));
        match &events[0] {
            NotifyEvent::Motion(m) => {
                assert!((m.vscroll - 2.0).abs() < 1e-5);
                assert_eq!(m.hscroll, 0.0);
            }
            other => panic!("expected motion, got {:?}", other),
        }
        // next empty frame: scroll drained, nothing emitted
        assert!(mapper.process(&sync_at(10)).is_empty());
    }

    #[test]
    fn capture_mode_skips_cursor_surface_and_retags_source() {
        let (mut mapper, surface, mut config) = mouse_setup();
        config.pointer.capture = true;
        mapper.reconfigure(t(0), &config, ConfigurationChanges::pointer_capture());
        assert_eq!(mapper.current_mode(), Mode::PointerRelative);

        let before = surface.position();
        mapper.process(&rel(RawAxis::X, 5, 10));
        let events = mapper.process(&sync_at(10));
        match &events[0] {
            NotifyEvent::Motion(m) => {
                assert_eq!(m.source, Source::MouseRelative);
                assert!((m.dx - 5.0).abs() < 1e-5);
            }
            other => panic!("expected motion, got {:?}", other),
        }
        assert_eq!(surface.position(), before);
    }

    #[test]
    fn capture_toggle_clears_pointer_velocity_history() {
        let mut config = test_config();
        // thresholds low enough that history affects the gain
        config.pointer.gain_low_speed = 10.0;
        config.pointer.gain_high_speed = 100.0;
        let surface = Arc::new(SharedPointerSurface::new(RectF::new(
            0.0, 0.0, 1000.0, 1000.0,
        )));
        let mut mapper = CursorMapper::new(
            &CursorCapabilities::standard_mouse("m"),
            &config,
            surface,
        );

        let burst = |mapper: &mut CursorMapper, base: i64| -> f32 {
            mapper.process(&rel(RawAxis::X, 40, base));
            mapper.process(&sync_at(base));
            mapper.process(&rel(RawAxis::X, 40, base + 10));
            match &mapper.process(&sync_at(base + 10))[0] {
                NotifyEvent::Motion(m) => m.dx,
                other => panic!("expected motion, got {:?}", other),
            }
        };

        let first = burst(&mut mapper, 0);

        config.pointer.capture = true;
        mapper.reconfigure(t(100), &config, ConfigurationChanges::pointer_capture());
        let after_toggle = burst(&mut mapper, 1000);

        assert!(
            (first - after_toggle).abs() < 1e-4,
            "first={} after_toggle={}",
            first,
            after_toggle
        );
    }

    #[test]
    fn speed_reconfigure_preserves_display_state_and_accumulators() {
        let (mut mapper, _, mut config) = mouse_setup();
        mapper.process(&rel(RawAxis::X, 3, 0));

        config.pointer.speed = 7;
        mapper.reconfigure(t(0), &config, ConfigurationChanges::pointer_speed());

        assert_eq!(mapper.associated_display(), Some(DisplayTarget::Display(0)));
        // pending accumulation survived the reconfigure
        mapper.process(&rel(RawAxis::X, 2, 5));
        let events = mapper.process(&sync_at(5));
        match &events[0] {
            NotifyEvent::Motion(m) => {
                // raw 5 scaled by 1.4^7
                let expected = 5.0 * 1.4_f32.powi(7);
                assert!((m.dx - expected).abs() < 1e-3, "dx={}", m.dx);
            }
            other => panic!("expected motion, got {:?}", other),
        }
    }

    #[test]
    fn losing_the_display_suppresses_output_but_frames_drain() {
        let (mut mapper, _, mut config) = mouse_setup();
        config.displays.clear();
        mapper.reconfigure(t(0), &config, ConfigurationChanges::display_info());
        assert_eq!(mapper.associated_display(), None);

        mapper.process(&rel(RawAxis::X, 5, 10));
        assert!(mapper.process(&sync_at(10)).is_empty());

        // restoring the display must not replay the suppressed delta
        mapper.reconfigure(t(20), &test_config(), ConfigurationChanges::display_info());
        assert!(mapper.process(&sync_at(20)).is_empty());
    }

    #[test]
    fn rotated_display_rotates_relative_motion() {
        let mut config = test_config();
        config.displays[0].rotation = Rotation::Deg90;
        let surface = Arc::new(SharedPointerSurface::new(RectF::new(
            0.0, 0.0, 1000.0, 1000.0,
        )));
        let mut mapper = CursorMapper::new(
            &CursorCapabilities::standard_mouse("m"),
            &config,
            surface,
        );
        mapper.process(&rel(RawAxis::X, 5, 0));
        let events = mapper.process(&sync_at(0));
        match &events[0] {
            NotifyEvent::Motion(m) => {
                // (5, 0) rotated 90 degrees becomes (0, -5)
                assert!(m.dx.abs() < 1e-5);
                assert!((m.dy + 5.0).abs() < 1e-5);
            }
            other => panic!("expected motion, got {:?}", other),
        }
    }

    #[test]
    fn non_orientation_aware_device_skips_rotation() {
        let mut config = test_config();
        config.displays[0].rotation = Rotation::Deg180;
        let mut caps = CursorCapabilities::standard_mouse("m");
        caps.orientation_aware = false;
        let surface = Arc::new(SharedPointerSurface::new(RectF::new(
            0.0, 0.0, 1000.0, 1000.0,
        )));
        let mut mapper = CursorMapper::new(&caps, &config, surface);
        mapper.process(&rel(RawAxis::X, 5, 0));
        let events = mapper.process(&sync_at(0));
        match &events[0] {
            NotifyEvent::Motion(m) => assert!((m.dx - 5.0).abs() < 1e-5),
            other => panic!("expected motion, got {:?}", other),
        }
    }

    #[test]
    fn absolute_tablet_tracks_display_proportionally() {
        let config = test_config();
        let surface = Arc::new(SharedPointerSurface::new(RectF::new(
            0.0, 0.0, 1000.0, 1000.0,
        )));
        let caps = CursorCapabilities::absolute_tablet(
            "tab",
            AbsAxisInfo { min: 0, max: 99 },
            AbsAxisInfo { min: 0, max: 99 },
        );
        let mut mapper = CursorMapper::new(&caps, &config, surface.clone());

        mapper.process(&RawSample::new(
            RawSampleKind::AbsolutePosition {
                axis: RawAxis::X,
                value: 99,
            },
            t(0),
        ));
        mapper.process(&RawSample::new(
            RawSampleKind::AbsolutePosition {
                axis: RawAxis::Y,
                value: 0,
            },
            t(0),
        ));
        let events = mapper.process(&sync_at(0));
        match &events[0] {
            NotifyEvent::Motion(m) => {
                assert!((m.x - 1000.0).abs() < 1e-3);
                assert!(m.y.abs() < 1e-3);
            }
            other => panic!("expected motion, got {:?}", other),
        }
        let (sx, sy) = surface.position();
        assert!((sx - 1000.0).abs() < 1e-3);
        assert!(sy.abs() < 1e-3);
    }

    #[test]
    fn navigation_threshold_emits_one_pair_and_keeps_carry() {
        let mut mapper = trackball_setup();
        assert_eq!(mapper.current_mode(), Mode::Navigation);

        for delta in [2, 2, 3] {
            mapper.process(&rel(RawAxis::X, delta, 0));
        }
        let events = mapper.process(&sync_at(0));
        let keys: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                NotifyEvent::Key(k) => Some(k),
                _ => None,
            })
            .collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].direction, Direction::Right);
        assert_eq!(keys[0].action, KeyAction::Down);
        assert_eq!(keys[1].direction, Direction::Right);
        assert_eq!(keys[1].action, KeyAction::Up);
        assert_eq!(mapper.navigation_carry(), (1, 0));
    }

    #[test]
    fn navigation_exact_threshold_leaves_zero_carry() {
        let mut mapper = trackball_setup();
        mapper.process(&rel(RawAxis::X, TRACKBALL_MOVEMENT_THRESHOLD, 0));
        let events = mapper.process(&sync_at(0));
        assert_eq!(events.len(), 2);
        assert_eq!(mapper.navigation_carry(), (0, 0));
    }

    #[test]
    fn navigation_multiple_thresholds_emit_multiple_pairs() {
        let mut mapper = trackball_setup();
        // 2.5x threshold: two pairs plus half a threshold of carry
        mapper.process(&rel(RawAxis::X, 15, 0));
        let events = mapper.process(&sync_at(0));
        assert_eq!(events.len(), 4);
        assert_eq!(mapper.navigation_carry(), (3, 0));
    }

    #[test]
    fn navigation_carry_spans_frames() {
        let mut mapper = trackball_setup();
        mapper.process(&rel(RawAxis::X, 4, 0));
        assert!(mapper.process(&sync_at(0)).is_empty());
        mapper.process(&rel(RawAxis::X, 2, 10));
        let events = mapper.process(&sync_at(10));
        assert_eq!(events.len(), 2);
        assert_eq!(mapper.navigation_carry(), (0, 0));
    }

    #[test]
    fn navigation_negative_and_vertical_directions() {
        let mut mapper = trackball_setup();
        mapper.process(&rel(RawAxis::X, -6, 0));
        mapper.process(&rel(RawAxis::Y, 6, 0));
        let events = mapper.process(&sync_at(0));
        let directions: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                NotifyEvent::Key(k) if k.action == KeyAction::Down => Some(k.direction),
                _ => None,
            })
            .collect();
        assert_eq!(directions, vec![Direction::Left, Direction::Down]);

        mapper.process(&rel(RawAxis::Y, -6, 10));
        let events = mapper.process(&sync_at(10));
        match &events[0] {
            NotifyEvent::Key(k) => assert_eq!(k.direction, Direction::Up),
            other => panic!("expected key, got {:?}", other),
        }
    }

    #[test]
    fn navigation_button_change_emits_independently() {
        let mut mapper = trackball_setup();
        mapper.process(&button(BTN_LEFT, true, 0));
        let events = mapper.process(&sync_at(0));
        assert_eq!(events.len(), 1);
        match &events[0] {
            NotifyEvent::Motion(m) => {
                assert_eq!(m.source, Source::Trackball);
                assert_eq!(m.display, DisplayTarget::Focused);
                assert_eq!(m.button_state, BUTTON_PRIMARY);
            }
            other => panic!("expected motion, got {:?}", other),
        }
    }

    #[test]
    fn scan_code_state_filters_by_source_mask() {
        let (mut mapper, _, _) = mouse_setup();
        mapper.process(&button(BTN_LEFT, true, 0));
        mapper.process(&sync_at(0));

        assert_eq!(mapper.scan_code_state(SOURCE_ANY, BTN_LEFT), ScanCodeState::Down);
        assert_eq!(mapper.scan_code_state(SOURCE_ANY, BTN_RIGHT), ScanCodeState::Up);
        assert_eq!(
            mapper.scan_code_state(SOURCE_TRACKBALL, BTN_LEFT),
            ScanCodeState::Unknown
        );
        assert_eq!(
            mapper.scan_code_state(SOURCE_ANY, 0x999),
            ScanCodeState::Unknown
        );
        // known scan code the device does not advertise
        assert_eq!(
            mapper.scan_code_state(SOURCE_ANY, BTN_BACK),
            ScanCodeState::Unknown
        );
    }

    #[test]
    fn reset_clears_runtime_state_but_not_display_state() {
        let (mut mapper, _, _) = mouse_setup();
        mapper.process(&button(BTN_LEFT, true, 0));
        mapper.process(&rel(RawAxis::X, 5, 0));
        mapper.process(&sync_at(0));

        mapper.reset(t(10));
        assert_eq!(mapper.scan_code_state(SOURCE_ANY, BTN_LEFT), ScanCodeState::Up);
        assert_eq!(mapper.associated_display(), Some(DisplayTarget::Display(0)));
        assert!(mapper.process(&sync_at(20)).is_empty());
    }

    #[test]
    fn dump_is_side_effect_free() {
        let (mut mapper, _, _) = mouse_setup();
        mapper.process(&rel(RawAxis::X, 5, 0));
        let before = mapper.dump();
        let again = mapper.dump();
        assert_eq!(before, again);
        assert!(before.contains("Pointer"));
        // pending accumulation untouched by dumping
        let events = mapper.process(&sync_at(0));
        assert_eq!(events.len(), 1);
    }
}
