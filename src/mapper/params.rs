//! Immutable device parameters and the reconfiguration change categories.

use std::fmt;

use crate::device::raw::CursorCapabilities;

/// Operating mode of a cursor device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// The device controls the on-screen cursor and reports absolute screen
    /// locations.
    Pointer,
    /// Pointer Capture is enabled on an otherwise-Pointer device: relative
    /// values only, no cursor movement. Entered and exited transiently via
    /// reconfigure, never chosen at probe time.
    PointerRelative,
    /// Trackball-style device emitting relative values and synthetic
    /// directional key events.
    Navigation,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Pointer => write!(f, "Pointer"),
            Mode::PointerRelative => write!(f, "PointerRelative"),
            Mode::Navigation => write!(f, "Navigation"),
        }
    }
}

/// Immutable configuration parameters, derived once from capability probing
/// at mapper construction. Never mutated by event processing; a capability
/// change requires a fresh mapper instance.
#[derive(Debug, Clone, Copy)]
pub struct Parameters {
    pub mode: Mode,
    pub has_associated_display: bool,
    pub orientation_aware: bool,
}

impl Parameters {
    pub fn compute(caps: &CursorCapabilities) -> Self {
        let has_pointer_axes = caps.has_relative_x
            || caps.has_relative_y
            || (caps.abs_x.is_some() && caps.abs_y.is_some());

        let mode = if caps.trackball_like && caps.abs_x.is_none() && caps.abs_y.is_none() {
            Mode::Navigation
        } else if caps.has_associated_display && has_pointer_axes {
            Mode::Pointer
        } else {
            Mode::Navigation
        };

        Self {
            mode,
            has_associated_display: mode == Mode::Pointer,
            orientation_aware: caps.orientation_aware && mode == Mode::Pointer,
        }
    }
}

/// The three independent configuration-change categories. Reconfigure applies
/// exactly the flagged subsets and leaves the others untouched; changes
/// arrive independently and out of order relative to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigurationChanges {
    pub pointer_capture: bool,
    pub pointer_speed: bool,
    pub display_info: bool,
}

impl ConfigurationChanges {
    pub fn all() -> Self {
        Self {
            pointer_capture: true,
            pointer_speed: true,
            display_info: true,
        }
    }

    pub fn pointer_capture() -> Self {
        Self {
            pointer_capture: true,
            ..Self::default()
        }
    }

    pub fn pointer_speed() -> Self {
        Self {
            pointer_speed: true,
            ..Self::default()
        }
    }

    pub fn display_info() -> Self {
        Self {
            display_info: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::raw::AbsAxisInfo;

    #[test]
    fn mouse_with_display_resolves_to_pointer() {
        let params = Parameters::compute(&CursorCapabilities::standard_mouse("mouse"));
        assert_eq!(params.mode, Mode::Pointer);
        assert!(params.has_associated_display);
        assert!(params.orientation_aware);
    }

    #[test]
    fn trackball_resolves_to_navigation() {
        let params = Parameters::compute(&CursorCapabilities::trackball("ball"));
        assert_eq!(params.mode, Mode::Navigation);
        assert!(!params.has_associated_display);
        assert!(!params.orientation_aware);
    }

    #[test]
    fn absolute_tablet_resolves_to_pointer() {
        let caps = CursorCapabilities::absolute_tablet(
            "tab",
            AbsAxisInfo { min: 0, max: 4095 },
            AbsAxisInfo { min: 0, max: 4095 },
        );
        let params = Parameters::compute(&caps);
        assert_eq!(params.mode, Mode::Pointer);
    }

    #[test]
    fn relative_device_without_display_falls_back_to_navigation() {
        let mut caps = CursorCapabilities::standard_mouse("floating");
        caps.has_associated_display = false;
        let params = Parameters::compute(&caps);
        assert_eq!(params.mode, Mode::Navigation);
    }

    #[test]
    fn pointer_relative_is_never_chosen_at_probe_time() {
        for caps in [
            CursorCapabilities::standard_mouse("m"),
            CursorCapabilities::trackball("t"),
        ] {
            assert_ne!(Parameters::compute(&caps).mode, Mode::PointerRelative);
        }
    }
}
