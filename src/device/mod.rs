//! Hardware-facing side of the reader: raw sample types, capability
//! descriptors, and the gilrs-backed sample collector.

pub mod collector;
pub mod raw;

pub use collector::{CollectorError, CollectorHandle, CollectorSettings};
pub use raw::{
    AbsAxisInfo, CursorCapabilities, RawAxis, RawSample, RawSampleKind, ScrollAxis,
};
