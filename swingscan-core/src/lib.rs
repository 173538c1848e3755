//! swingscan core: domain types, indicators, detectors and bar sources.
//!
//! This crate holds the pure detection pipeline:
//! - Domain types (bars, signals, pattern matches, session hours)
//! - Detection parameters and their validation
//! - Indicator Engine (swing levels, volume ratio, range, RSI, rate of change)
//! - Signal Detector (swing breakout/breakdown, momentum buildup, volume spikes)
//! - Pattern Detector (reversals, divergence, retests, confirmation checks)
//! - Bar sources (Yahoo chart API, deterministic synthetic data)

pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod params;
pub mod patterns;
pub mod signals;

pub use error::DetectionError;
pub use params::{DetectionParams, MomentumParams, ParamError, PatternParams};
