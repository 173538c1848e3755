//! Detection parameters.
//!
//! One immutable value is passed into every Indicator Engine and detector
//! invocation. Nothing reads parameters from shared state, so two invocations
//! with different parameters can never leak into each other.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ConfirmationCheck, ConfirmationSet, PatternKind};

/// Inward margin applied to rolling extrema when forming swing levels.
pub const SWING_MARGIN: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("{name} must be at least 1, got {value}")]
    NonPositiveWindow { name: &'static str, value: usize },
    #[error("{name} must be > 0, got {value}")]
    NonPositiveMultiplier { name: &'static str, value: f64 },
    #[error("{name} = {value} is outside {expected}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("min span {min} exceeds max span {max}")]
    SpanOrder { min: usize, max: usize },
}

/// Core detection parameters: L, V, M, H plus the optional detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    /// Swing lookback window L (bars).
    pub lookback: usize,
    /// Average-volume window V (bars).
    pub volume_window: usize,
    /// Volume ratio threshold M.
    pub volume_multiplier: f64,
    /// Hold length H (bars).
    pub hold_bars: usize,
    /// Fraction of M applied to the most recent bar in live detection.
    pub live_volume_factor: f64,
    pub momentum: MomentumParams,
    pub patterns: PatternParams,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            lookback: 12,
            volume_window: 70,
            volume_multiplier: 1.6,
            hold_bars: 3,
            live_volume_factor: 0.75,
            momentum: MomentumParams::default(),
            patterns: PatternParams::default(),
        }
    }
}

impl DetectionParams {
    /// First index at which every input of the swing rules is defined.
    pub fn warmup_end(&self) -> usize {
        self.lookback.max(self.volume_window)
    }

    /// Minimum bar count for any detection: max(L, V) + H + 1.
    pub fn required_bars(&self) -> usize {
        self.warmup_end() + self.hold_bars + 1
    }

    /// Volume threshold for the latest bar in live detection.
    pub fn live_volume_multiplier(&self) -> f64 {
        self.volume_multiplier * self.live_volume_factor
    }

    /// Reject invalid values; nothing is ever clamped.
    pub fn validate(&self) -> Result<(), ParamError> {
        window("lookback", self.lookback)?;
        window("volume_window", self.volume_window)?;
        window("hold_bars", self.hold_bars)?;
        multiplier("volume_multiplier", self.volume_multiplier)?;
        if !(self.live_volume_factor > 0.0 && self.live_volume_factor <= 1.0) {
            return Err(ParamError::OutOfRange {
                name: "live_volume_factor",
                value: self.live_volume_factor,
                expected: "(0, 1]",
            });
        }
        self.momentum.validate()?;
        self.patterns.validate()
    }
}

/// Pre-breakout momentum detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumParams {
    pub enabled: bool,
    /// Rate-of-change period in bars (2 or 3).
    pub roc_bars: usize,
    /// Minimum absolute rate of change, percent.
    pub min_roc_pct: f64,
    /// Number of trailing bars that must move in one direction on rising volume.
    pub run_length: usize,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            enabled: false,
            roc_bars: 3,
            min_roc_pct: 1.0,
            run_length: 3,
        }
    }
}

impl MomentumParams {
    fn validate(&self) -> Result<(), ParamError> {
        if !(2..=3).contains(&self.roc_bars) {
            return Err(ParamError::OutOfRange {
                name: "momentum.roc_bars",
                value: self.roc_bars as f64,
                expected: "[2, 3]",
            });
        }
        window("momentum.run_length", self.run_length)?;
        multiplier("momentum.min_roc_pct", self.min_roc_pct)
    }
}

/// Pattern Detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    pub enabled: bool,
    pub kinds: Vec<PatternKind>,
    /// Optional checks that must all pass when applicable.
    pub checks: ConfirmationSet,
    pub symmetry_tolerance_pct: f64,
    pub retest_tolerance_pct: f64,
    /// Bars from first to last formation point.
    pub min_span: usize,
    pub max_span: usize,
    /// Minimum bars between neighbouring extrema.
    pub min_point_spacing: usize,
    /// Minimum prominence of a price extremum, percent of the series range.
    pub prominence_pct: f64,
    /// Minimum prominence of an oscillator extremum, in oscillator points.
    pub oscillator_prominence: f64,
    pub oscillator_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub break_volume_multiplier: f64,
    /// Bars after the last point in which the neckline must break.
    pub confirmation_window: usize,
    /// Bars after a level break in which the retest must occur.
    pub retest_window: usize,
    /// Bars either side of a price extremum searched for the oscillator extreme.
    pub divergence_alignment: usize,
    pub entry_buffer_pct: f64,
    pub stop_buffer_pct: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            enabled: true,
            kinds: PatternKind::ALL.to_vec(),
            checks: [
                ConfirmationCheck::PriceSymmetry,
                ConfirmationCheck::TimeSpacing,
                ConfirmationCheck::BreakVolume,
            ]
            .into_iter()
            .collect(),
            symmetry_tolerance_pct: 2.0,
            retest_tolerance_pct: 2.0,
            min_span: 10,
            max_span: 150,
            min_point_spacing: 5,
            prominence_pct: 1.0,
            oscillator_prominence: 2.0,
            oscillator_period: 14,
            oversold: 30.0,
            overbought: 70.0,
            break_volume_multiplier: 1.2,
            confirmation_window: 20,
            retest_window: 20,
            divergence_alignment: 2,
            entry_buffer_pct: 0.1,
            stop_buffer_pct: 2.0,
        }
    }
}

impl PatternParams {
    pub fn is_enabled(&self, kind: PatternKind) -> bool {
        self.enabled && self.kinds.contains(&kind)
    }

    fn validate(&self) -> Result<(), ParamError> {
        window("patterns.min_point_spacing", self.min_point_spacing)?;
        window("patterns.oscillator_period", self.oscillator_period)?;
        window("patterns.confirmation_window", self.confirmation_window)?;
        window("patterns.retest_window", self.retest_window)?;
        if self.min_span > self.max_span {
            return Err(ParamError::SpanOrder {
                min: self.min_span,
                max: self.max_span,
            });
        }
        non_negative("patterns.symmetry_tolerance_pct", self.symmetry_tolerance_pct)?;
        non_negative("patterns.retest_tolerance_pct", self.retest_tolerance_pct)?;
        non_negative("patterns.prominence_pct", self.prominence_pct)?;
        non_negative("patterns.oscillator_prominence", self.oscillator_prominence)?;
        non_negative("patterns.entry_buffer_pct", self.entry_buffer_pct)?;
        non_negative("patterns.stop_buffer_pct", self.stop_buffer_pct)?;
        multiplier(
            "patterns.break_volume_multiplier",
            self.break_volume_multiplier,
        )?;
        if !(0.0..=100.0).contains(&self.oversold)
            || !(0.0..=100.0).contains(&self.overbought)
            || self.oversold >= self.overbought
        {
            return Err(ParamError::OutOfRange {
                name: "patterns.oversold/overbought",
                value: self.oversold,
                expected: "0 <= oversold < overbought <= 100",
            });
        }
        Ok(())
    }
}

fn window(name: &'static str, value: usize) -> Result<(), ParamError> {
    if value == 0 {
        return Err(ParamError::NonPositiveWindow { name, value });
    }
    Ok(())
}

fn multiplier(name: &'static str, value: f64) -> Result<(), ParamError> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(ParamError::NonPositiveMultiplier { name, value });
    }
    Ok(())
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ParamError> {
    if !(value >= 0.0 && value.is_finite()) {
        return Err(ParamError::OutOfRange {
            name,
            value,
            expected: "[0, inf)",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = DetectionParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.warmup_end(), 70);
        assert_eq!(params.required_bars(), 74);
        assert!((params.live_volume_multiplier() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn zero_window_rejected() {
        let params = DetectionParams {
            lookback: 0,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(ParamError::NonPositiveWindow {
                name: "lookback",
                value: 0
            })
        );
    }

    #[test]
    fn non_positive_multiplier_rejected() {
        for m in [0.0, -1.0, f64::NAN] {
            let params = DetectionParams {
                volume_multiplier: m,
                ..Default::default()
            };
            assert!(matches!(
                params.validate(),
                Err(ParamError::NonPositiveMultiplier { .. })
            ));
        }
    }

    #[test]
    fn zero_hold_rejected() {
        let params = DetectionParams {
            hold_bars: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn live_factor_bounds() {
        for f in [0.0, 1.01] {
            let params = DetectionParams {
                live_volume_factor: f,
                ..Default::default()
            };
            assert!(params.validate().is_err());
        }
        let params = DetectionParams {
            live_volume_factor: 1.0,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn span_order_rejected() {
        let mut params = DetectionParams::default();
        params.patterns.min_span = 200;
        params.patterns.max_span = 100;
        assert_eq!(
            params.validate(),
            Err(ParamError::SpanOrder { min: 200, max: 100 })
        );
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let params: DetectionParams = toml::from_str(
            r#"
            lookback = 20
            [patterns]
            checks = ["volume_trend"]
            "#,
        )
        .unwrap();
        assert_eq!(params.lookback, 20);
        assert_eq!(params.volume_window, 70);
        assert!(params.patterns.checks.contains(ConfirmationCheck::VolumeTrend));
        assert!(!params.patterns.checks.contains(ConfirmationCheck::BreakVolume));
        assert_eq!(params.patterns.kinds.len(), 9);
    }
}
