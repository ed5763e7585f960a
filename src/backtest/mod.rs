//! Forward-walking backtest
//!
//! The replay is a two-state machine (`Flat`, `InTrade`). A buy-tier signal on bar `i`
//! enters at the open of bar `i + 1` with a fixed percentage target and stop. Exits are
//! resolved bar by bar, gaps first, and a bar that touches both levels counts as a loss
//! at the stop. A position still open when the data ends is not part of the trade log.

pub mod replay;

pub use replay::*;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::signal::SignalState;

// ============================================================
// TRADE
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Win,
    Loss,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// Bar opened at or above the target
    GapTarget,
    /// Bar opened at or below the stop
    GapStop,
    /// Bar range covered both levels; assumed stopped out
    BothHitAssumeStop,
    TargetHit,
    StopHit,
}

impl ExitReason {
    pub fn outcome(self) -> Outcome {
        match self {
            Self::GapTarget | Self::TargetHit => Outcome::Win,
            Self::GapStop | Self::BothHitAssumeStop | Self::StopHit => Outcome::Loss,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GapTarget => "GAP_TARGET",
            Self::GapStop => "GAP_STOP",
            Self::BothHitAssumeStop => "BOTH_HIT_ASSUME_STOP",
            Self::TargetHit => "TARGET_HIT",
            Self::StopHit => "STOP_HIT",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed simulated position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trade {
    /// Bar that produced the signal
    pub signal_index: usize,
    pub entry_index: usize,
    pub entry_date: Option<NaiveDate>,
    pub entry_price: f64,
    pub entry_reason: SignalState,
    pub exit_index: usize,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub outcome: Outcome,
    /// `(exit - entry) / entry * 100`
    pub return_pct: f64,
}

impl Trade {
    #[inline]
    pub fn is_win(&self) -> bool {
        self.outcome == Outcome::Win
    }
}

/// Position left open when the series ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpenTrade {
    pub signal_index: usize,
    pub entry_index: usize,
    pub entry_date: Option<NaiveDate>,
    pub entry_price: f64,
    pub entry_reason: SignalState,
    pub target: f64,
    pub stop: f64,
}

// ============================================================
// SUMMARY
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BacktestSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// `wins / total * 100`, 0 when there are no trades
    pub win_rate: f64,
    /// Mean of `return_pct`, 0 when there are no trades
    pub avg_return_pct: f64,
    /// Deepest peak-to-trough fall, in percent, of the equity curve built by
    /// compounding each trade's return from a starting value of 1
    pub max_drawdown_pct: f64,
}

impl BacktestSummary {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let total_trades = trades.len();
        if total_trades == 0 {
            return Self::default();
        }
        let wins = trades.iter().filter(|t| t.is_win()).count();
        let sum_return: f64 = trades.iter().map(|t| t.return_pct).sum();
        Self {
            total_trades,
            wins,
            losses: total_trades - wins,
            win_rate: wins as f64 / total_trades as f64 * 100.0,
            avg_return_pct: sum_return / total_trades as f64,
            max_drawdown_pct: max_drawdown_pct(trades),
        }
    }
}

fn max_drawdown_pct(trades: &[Trade]) -> f64 {
    let mut equity = 1.0_f64;
    let mut peak = equity;
    let mut worst = 0.0_f64;
    for t in trades {
        equity *= 1.0 + t.return_pct / 100.0;
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.max((peak - equity) / peak * 100.0);
        }
    }
    worst
}

/// Result of a replay
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestReport {
    pub trades: Vec<Trade>,
    pub summary: BacktestSummary,
    pub open_trade: Option<OpenTrade>,
}

impl BacktestReport {
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}
