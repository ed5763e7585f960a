//! Breakout signal classification
//!
//! Each bar gets a [`Conditions`] vector computed against the trailing lookback window
//! and is then labelled with a [`SignalState`]. Tiers are tried strongest first:
//!
//! 1. `ConfirmBuy`: breakout, above EMA200, score >= required, strong close, two-day build-up
//! 2. `EarlyBuy`: breakout, early trend, volume, RSI, strong close
//! 3. `RetestBuy`: close near EMA20/EMA50, early trend, volume, strong close, RSI
//! 4. `Prepare`: near breakout, early trend, and volume or RSI
//! 5. `NoTrade`

pub mod conditions;

pub use conditions::*;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::AtrMultipliers;
use crate::indicators::IndicatorRow;

// ============================================================
// SIGNAL STATE
// ============================================================

/// Classification of a single bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalState {
    #[default]
    NoTrade,
    Prepare,
    EarlyBuy,
    RetestBuy,
    ConfirmBuy,
}

impl SignalState {
    /// Apply the tier rules top-down; the first matching tier wins.
    pub fn classify(c: &Conditions, required_score: u8) -> Self {
        if c.breakout
            && c.above_long_trend
            && c.score() >= required_score
            && c.close_strong
            && c.two_day_confirm
        {
            Self::ConfirmBuy
        } else if c.breakout && c.early_trend_ok && c.volume_ok && c.rsi_ok && c.close_strong {
            Self::EarlyBuy
        } else if c.retest_zone && c.early_trend_ok && c.volume_ok && c.close_strong && c.rsi_ok {
            Self::RetestBuy
        } else if c.near_breakout && c.early_trend_ok && (c.volume_ok || c.rsi_ok) {
            Self::Prepare
        } else {
            Self::NoTrade
        }
    }

    /// True for the tiers that open a position in a backtest
    #[inline]
    pub fn is_buy(self) -> bool {
        matches!(self, Self::ConfirmBuy | Self::EarlyBuy | Self::RetestBuy)
    }

    /// ATR multiple for this tier's suggested stop, `None` for non-buy states
    pub fn atr_multiplier(self, mults: &AtrMultipliers) -> Option<f64> {
        match self {
            Self::EarlyBuy => Some(mults.early),
            Self::ConfirmBuy => Some(mults.confirm),
            Self::RetestBuy => Some(mults.retest),
            Self::NoTrade | Self::Prepare => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoTrade => "NO_TRADE",
            Self::Prepare => "PREPARE",
            Self::EarlyBuy => "EARLY_BUY",
            Self::RetestBuy => "RETEST_BUY",
            Self::ConfirmBuy => "CONFIRM_BUY",
        }
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// CONDITIONS
// ============================================================

/// Boolean condition vector for one bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Conditions {
    pub breakout: bool,
    pub near_breakout: bool,
    pub volume_ok: bool,
    pub early_trend_ok: bool,
    pub above_long_trend: bool,
    pub rsi_ok: bool,
    pub close_strong: bool,
    pub retest_zone: bool,
    /// Only gates `ConfirmBuy`
    pub two_day_confirm: bool,
}

impl Conditions {
    /// Count of {breakout, volume_ok, early_trend_ok, rsi_ok}
    pub fn score(&self) -> u8 {
        [self.breakout, self.volume_ok, self.early_trend_ok, self.rsi_ok]
            .iter()
            .filter(|&&c| c)
            .count() as u8
    }
}

// ============================================================
// SIGNAL REPORT
// ============================================================

/// Everything known about one bar's classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SignalReport {
    pub index: usize,
    pub date: Option<NaiveDate>,
    pub close: f64,
    /// Highest high of the lookback window before this bar
    pub prior_high: Option<f64>,
    /// `None` when history or an indicator was not ready
    pub conditions: Option<Conditions>,
    pub state: SignalState,
    pub indicators: IndicatorRow,
    /// Suggested ATR stop for buy tiers
    pub atr_stop: Option<f64>,
}

impl SignalReport {
    pub fn score(&self) -> u8 {
        self.conditions.map(|c| c.score()).unwrap_or(0)
    }
}

// ============================================================
// TESTS
// ============================================================
