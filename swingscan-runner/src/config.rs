//! TOML configuration for scans, backtests and the monitor.
//!
//! Every section and field is optional; missing values take the defaults
//! below. Parameters are read once per invocation and passed down by value.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use swingscan_core::domain::{Interval, SessionHours};
use swingscan_core::params::{DetectionParams, ParamError};
use thiserror::Error;

use crate::calendar::MarketCalendar;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ParamError> for ConfigError {
    fn from(e: ParamError) -> Self {
        Self::Invalid(e.to_string())
    }
}

/// Full configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub detection: DetectionParams,
    pub universe: UniverseConfig,
    pub data: DataConfig,
    pub monitor: MonitorConfig,
    pub backtest: BacktestSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Bar interval the detectors run on.
    pub interval: Interval,
    /// Short interval for volume spikes; `None` disables them.
    pub fine_interval: Option<Interval>,
    /// Calendar days of history fetched before the current session.
    pub history_days: u32,
    pub provider: ProviderKind,
    /// Exchange suffix appended to bare symbols by the Yahoo provider.
    pub symbol_suffix: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            interval: Interval::hourly(),
            fine_interval: Some(Interval::minutes(15)),
            history_days: 30,
            provider: ProviderKind::Yahoo,
            symbol_suffix: ".NS".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub timezone: Tz,
    #[serde(flatten)]
    pub session: SessionHours,
    /// Delay after a bar boundary before checking, so the bar is closed.
    pub check_buffer_secs: u32,
    /// Symbols fetched and analysed concurrently within one check.
    pub max_in_flight: usize,
    pub holidays: BTreeSet<NaiveDate>,
    /// On startup, run the most recent slot immediately if it was missed by
    /// no more than this many minutes while the market is open.
    pub startup_catchup_mins: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Kolkata,
            session: SessionHours::default(),
            check_buffer_secs: 30,
            max_in_flight: 10,
            holidays: BTreeSet::new(),
            startup_catchup_mins: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    /// Bars a confirmed pattern is followed before it expires.
    pub outcome_horizon: usize,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self { outcome_horizon: 20 }
    }
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        Ok(config)
    }

    /// Parse and validate.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection.validate()?;
        if self.universe.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid("universe contains an empty symbol".into()));
        }
        if let Some(fine) = self.data.fine_interval {
            if fine >= self.data.interval {
                return Err(ConfigError::Invalid(format!(
                    "fine_interval {fine} must be shorter than interval {}",
                    self.data.interval
                )));
            }
        }
        if self.data.history_days == 0 {
            return Err(ConfigError::Invalid("history_days must be at least 1".into()));
        }
        if self.monitor.session.open >= self.monitor.session.close {
            return Err(ConfigError::Invalid(format!(
                "session open {} must precede close {}",
                self.monitor.session.open, self.monitor.session.close
            )));
        }
        if self.monitor.max_in_flight == 0 {
            return Err(ConfigError::Invalid("max_in_flight must be at least 1".into()));
        }
        if self.backtest.outcome_horizon == 0 {
            return Err(ConfigError::Invalid("outcome_horizon must be at least 1".into()));
        }
        Ok(())
    }

    pub fn calendar(&self) -> MarketCalendar {
        MarketCalendar::new(
            self.monitor.timezone,
            self.monitor.session,
            self.data.interval,
            chrono::Duration::seconds(i64::from(self.monitor.check_buffer_secs)),
            self.monitor.holidays.iter().copied(),
        )
    }
}
