//! Domain types for swingscan

pub mod bar;
pub mod pattern;
pub mod session;
pub mod signal;

pub use bar::{is_strictly_ordered, Bar};
pub use pattern::{
    ConfirmationCheck, ConfirmationSet, ExtremumPoint, PatternKind, PatternMatch, PointRole,
};
pub use session::{Interval, IntervalParseError, SessionHours};
pub use signal::{DetectionKey, DetectionKind, Direction, Signal, SignalKind, SignalSource};

/// Symbol type alias
pub type Symbol = String;
