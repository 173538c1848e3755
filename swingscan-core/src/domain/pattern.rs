//! Pattern match: a validated multi-point chart formation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::signal::{DetectionKey, DetectionKind, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    DoubleTop,
    DoubleBottom,
    TripleTop,
    TripleBottom,
    InverseHeadAndShoulders,
    DivergenceBullish,
    DivergenceBearish,
    RetestUptrend,
    RetestDowntrend,
}

impl PatternKind {
    pub const ALL: [PatternKind; 9] = [
        Self::DoubleTop,
        Self::DoubleBottom,
        Self::TripleTop,
        Self::TripleBottom,
        Self::InverseHeadAndShoulders,
        Self::DivergenceBullish,
        Self::DivergenceBearish,
        Self::RetestUptrend,
        Self::RetestDowntrend,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::DoubleTop => "double_top",
            Self::DoubleBottom => "double_bottom",
            Self::TripleTop => "triple_top",
            Self::TripleBottom => "triple_bottom",
            Self::InverseHeadAndShoulders => "inverse_head_and_shoulders",
            Self::DivergenceBullish => "divergence_bullish",
            Self::DivergenceBearish => "divergence_bearish",
            Self::RetestUptrend => "retest_uptrend",
            Self::RetestDowntrend => "retest_downtrend",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Self::DoubleBottom
            | Self::TripleBottom
            | Self::InverseHeadAndShoulders
            | Self::DivergenceBullish
            | Self::RetestUptrend => Direction::Long,
            Self::DoubleTop | Self::TripleTop | Self::DivergenceBearish | Self::RetestDowntrend => {
                Direction::Short
            }
        }
    }

    /// Top formations: points are peaks and the neckline sits below them.
    pub fn is_top(self) -> bool {
        matches!(self, Self::DoubleTop | Self::TripleTop)
    }

    /// Bottom formations: points are troughs and the neckline sits above them.
    pub fn is_bottom(self) -> bool {
        matches!(
            self,
            Self::DoubleBottom | Self::TripleBottom | Self::InverseHeadAndShoulders
        )
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointRole {
    Peak,
    Trough,
    LeftShoulder,
    Head,
    RightShoulder,
    /// Bar that broke the level a retest returns to.
    Break,
    Retest,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtremumPoint {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub role: PointRole,
}

/// Optional confirmatory checks a pattern can be required to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationCheck {
    /// Like points within the symmetry tolerance of each other.
    PriceSymmetry,
    /// Points far enough apart and the formation span within bounds.
    TimeSpacing,
    /// Volume declining across tops, rising across bottoms.
    VolumeTrend,
    /// Oscillator overbought at top points, oversold at bottom points.
    OscillatorExtreme,
    /// Reversal candle at the confirming bar.
    ReversalCandle,
    /// Volume expansion on the bar that breaks the level.
    BreakVolume,
}

impl ConfirmationCheck {
    pub const ALL: [ConfirmationCheck; 6] = [
        Self::PriceSymmetry,
        Self::TimeSpacing,
        Self::VolumeTrend,
        Self::OscillatorExtreme,
        Self::ReversalCandle,
        Self::BreakVolume,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PriceSymmetry => "price_symmetry",
            Self::TimeSpacing => "time_spacing",
            Self::VolumeTrend => "volume_trend",
            Self::OscillatorExtreme => "oscillator_extreme",
            Self::ReversalCandle => "reversal_candle",
            Self::BreakVolume => "break_volume",
        }
    }
}

/// Bitmask set of [`ConfirmationCheck`]s.
///
/// Serializes as a list of check names so configuration files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConfirmationSet(u8);

impl ConfirmationSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        ConfirmationCheck::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, check: ConfirmationCheck) {
        self.0 |= check.bit();
    }

    pub fn with(mut self, check: ConfirmationCheck) -> Self {
        self.insert(check);
        self
    }

    pub fn contains(self, check: ConfirmationCheck) -> bool {
        self.0 & check.bit() != 0
    }

    pub fn is_superset(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ConfirmationCheck> {
        ConfirmationCheck::ALL
            .into_iter()
            .filter(move |c| self.contains(*c))
    }
}

impl FromIterator<ConfirmationCheck> for ConfirmationSet {
    fn from_iter<I: IntoIterator<Item = ConfirmationCheck>>(iter: I) -> Self {
        let mut set = Self::empty();
        for check in iter {
            set.insert(check);
        }
        set
    }
}

impl Serialize for ConfirmationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for ConfirmationSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let checks = Vec::<ConfirmationCheck>::deserialize(deserializer)?;
        Ok(checks.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub symbol: String,
    pub kind: PatternKind,
    /// Formation points in increasing bar order.
    pub points: Vec<ExtremumPoint>,
    /// Neckline for reversal formations, broken level for retests.
    pub level: f64,
    /// Bar whose close completed the pattern.
    pub confirm_index: usize,
    pub confirm_timestamp: NaiveDateTime,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    /// Applicable checks that passed, whether or not they were required.
    pub confirmations: ConfirmationSet,
}

impl PatternMatch {
    pub fn direction(&self) -> Direction {
        self.kind.direction()
    }

    pub fn key(&self) -> DetectionKey {
        DetectionKey {
            symbol: self.symbol.clone(),
            timestamp: self.confirm_timestamp,
            kind: DetectionKind::Pattern(self.kind),
        }
    }

    /// Reward-to-risk ratio from entry; `None` if the stop is at the entry.
    pub fn reward_risk(&self) -> Option<f64> {
        let risk = (self.entry - self.stop).abs();
        if risk == 0.0 {
            return None;
        }
        Some((self.target - self.entry).abs() / risk)
    }
}
