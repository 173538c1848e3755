//! Forward evaluation of confirmed patterns.
//!
//! A match is entered at the open of the bar after its confirming bar and
//! followed for a fixed horizon. The first bar touching the stop or the
//! target decides the outcome; when one bar touches both, the stop wins.
//! A match that touches neither within the full horizon expires at the
//! horizon bar's close. Matches without a full horizon of bars left are
//! still open and produce no outcome.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use swingscan_core::domain::{Bar, Direction, PatternKind, PatternMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternOutcome {
    pub symbol: String,
    pub kind: PatternKind,
    pub confirm_timestamp: NaiveDateTime,
    pub entry_index: usize,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_timestamp: NaiveDateTime,
    pub exit_price: f64,
    pub outcome: Outcome,
    pub pnl_pct: f64,
    pub bars_held: usize,
}

/// Follow `m` forward through `bars` for `horizon` bars.
pub fn evaluate_pattern(bars: &[Bar], m: &PatternMatch, horizon: usize) -> Option<PatternOutcome> {
    let entry_index = m.confirm_index + 1;
    let last = m.confirm_index + horizon;
    if horizon == 0 || last >= bars.len() {
        return None;
    }
    let direction = m.direction();
    let entry_price = bars[entry_index].open;
    if entry_price <= 0.0 {
        return None;
    }

    let mut exit = None;
    for (k, bar) in bars.iter().enumerate().take(last + 1).skip(entry_index) {
        let (stopped, hit) = match direction {
            Direction::Short => (bar.high >= m.stop, bar.low <= m.target),
            _ => (bar.low <= m.stop, bar.high >= m.target),
        };
        if stopped {
            exit = Some((k, m.stop, Outcome::Loss));
            break;
        }
        if hit {
            exit = Some((k, m.target, Outcome::Win));
            break;
        }
    }
    let (exit_index, exit_price, outcome) =
        exit.unwrap_or((last, bars[last].close, Outcome::Expired));

    Some(PatternOutcome {
        symbol: m.symbol.clone(),
        kind: m.kind,
        confirm_timestamp: m.confirm_timestamp,
        entry_index,
        entry_price,
        exit_index,
        exit_timestamp: bars[exit_index].timestamp,
        exit_price,
        outcome,
        pnl_pct: direction.sign() * (exit_price - entry_price) / entry_price * 100.0,
        bars_held: exit_index + 1 - entry_index,
    })
}

/// Per-kind outcome counts and P&L.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub count: usize,
    pub wins: usize,
    pub losses: usize,
    pub expired: usize,
    /// wins / count, as a fraction.
    pub win_rate: f64,
    pub avg_pnl_pct: f64,
    pub total_pnl_pct: f64,
}

pub fn summarize(outcomes: &[PatternOutcome]) -> BTreeMap<PatternKind, OutcomeSummary> {
    let mut out: BTreeMap<PatternKind, OutcomeSummary> = BTreeMap::new();
    for o in outcomes {
        let s = out.entry(o.kind).or_default();
        s.count += 1;
        s.total_pnl_pct += o.pnl_pct;
        match o.outcome {
            Outcome::Win => s.wins += 1,
            Outcome::Loss => s.losses += 1,
            Outcome::Expired => s.expired += 1,
        }
    }
    for s in out.values_mut() {
        s.win_rate = s.wins as f64 / s.count as f64;
        s.avg_pnl_pct = s.total_pnl_pct / s.count as f64;
    }
    out
}
