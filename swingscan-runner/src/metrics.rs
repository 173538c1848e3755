//! Trade statistics: pure reductions over a trade list.
//!
//! Every metric is a pure function of trade P&L percentages. No dependency on
//! the simulator, data loading or the monitor.

use serde::{Deserialize, Serialize};

use crate::backtest::Trade;

/// Aggregate statistics over one symbol's trades (or a pooled set).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolStats {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    /// wins / total, as a fraction; 0 with no trades.
    pub win_rate: f64,
    pub avg_pnl_pct: f64,
    pub total_pnl_pct: f64,
    pub avg_gain_pct: f64,
    pub avg_loss_pct: f64,
    /// sum(gains) / |sum(losses)|; `None` when there is no losing trade.
    pub profit_factor: Option<f64>,
    pub best_pct: f64,
    pub worst_pct: f64,
}

impl SymbolStats {
    pub fn compute(trades: &[Trade]) -> Self {
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
        Self::from_pnls(&pnls)
    }

    pub fn from_pnls(pnls: &[f64]) -> Self {
        if pnls.is_empty() {
            return Self::default();
        }
        let gains: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();
        let total: f64 = pnls.iter().sum();
        Self {
            trade_count: pnls.len(),
            wins: gains.len(),
            losses: losses.len(),
            win_rate: win_rate(pnls),
            avg_pnl_pct: total / pnls.len() as f64,
            total_pnl_pct: total,
            avg_gain_pct: mean(&gains),
            avg_loss_pct: mean(&losses),
            profit_factor: profit_factor(pnls),
            best_pct: pnls.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_pct: pnls.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades with positive P&L.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|p| **p > 0.0).count() as f64 / pnls.len() as f64
}

/// Gross profit / gross loss. `None` when nothing lost, so callers never
/// divide by zero or print infinity.
pub fn profit_factor(pnls: &[f64]) -> Option<f64> {
    let gross_profit: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|p| **p < 0.0).map(|p| p.abs()).sum();
    (gross_loss > 0.0).then(|| gross_profit / gross_loss)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
