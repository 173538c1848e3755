//! Signal: a detector firing at one bar.
//!
//! Signals are immutable once emitted. They carry every field a downstream
//! notifier needs, so nothing downstream has to re-read the bar data.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional bias of a signal or pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    /// No directional intent (volume spikes).
    Neutral,
}

impl Direction {
    /// +1 for long, -1 for short, 0 for neutral. Multiplies raw price moves into P&L.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
            Self::Neutral => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Breakout,
    Breakdown,
    MomentumBuildup,
    VolumeSpike,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        Self::Breakout,
        Self::Breakdown,
        Self::MomentumBuildup,
        Self::VolumeSpike,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Breakout => "breakout",
            Self::Breakdown => "breakdown",
            Self::MomentumBuildup => "momentum_buildup",
            Self::VolumeSpike => "volume_spike",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which detector rule produced the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Swing,
    Momentum,
    VolumeSpike,
}

impl SignalSource {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Swing => "swing",
            Self::Momentum => "momentum",
            Self::VolumeSpike => "volume_spike",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub kind: SignalKind,
    pub direction: Direction,
    /// Index into the bar sequence the signal was detected on.
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    /// Close of the triggering bar.
    pub price: f64,
    pub volume_ratio: f64,
    /// Swing level crossed, rate of change for momentum, reference average
    /// volume for volume spikes.
    pub level: f64,
    pub range: Option<f64>,
    pub avg_range: Option<f64>,
    pub source: SignalSource,
}

impl Signal {
    pub fn key(&self) -> DetectionKey {
        DetectionKey {
            symbol: self.symbol.clone(),
            timestamp: self.timestamp,
            kind: DetectionKind::Signal(self.kind),
        }
    }
}

/// Kind tag shared by signals and pattern matches for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DetectionKind {
    Signal(SignalKind),
    Pattern(super::PatternKind),
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(kind) => write!(f, "{kind}"),
            Self::Pattern(kind) => write!(f, "{kind}"),
        }
    }
}

/// Identity of one detection: (symbol, timestamp, kind).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DetectionKey {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub kind: DetectionKind,
}
