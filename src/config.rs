//! Strategy configuration
//!
//! [`StrategyConfig`] replaces the per-script threshold forks with one value object.
//! The strictness knob selects a [`StrictnessProfile`] (volume multiplier, RSI band,
//! near-breakout tolerance, required score) unless a profile is set explicitly.

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorSettings;
use crate::{EngineError, Period, Ratio, Result};

// ============================================================
// STRICTNESS PROFILE
// ============================================================

/// Thresholds derived from the strictness parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrictnessProfile {
    /// Volume must exceed `vol_multiplier * avg_volume20`
    pub vol_multiplier: f64,
    pub rsi_low: f64,
    pub rsi_high: f64,
    /// Close must exceed `prior_high * near_factor` to count as near a breakout
    pub near_factor: f64,
    /// Minimum of {breakout, volume, early trend, RSI} for the confirmed tier
    pub required_score: u8,
}

impl StrictnessProfile {
    pub const STRICT: Self = Self {
        vol_multiplier: 1.5,
        rsi_low: 50.0,
        rsi_high: 75.0,
        near_factor: 0.99,
        required_score: 4,
    };

    pub const BALANCED: Self = Self {
        vol_multiplier: 1.2,
        rsi_low: 48.0,
        rsi_high: 78.0,
        near_factor: 0.985,
        required_score: 3,
    };

    pub const LIBERAL: Self = Self {
        vol_multiplier: 1.0,
        rsi_low: 45.0,
        rsi_high: 80.0,
        near_factor: 0.98,
        required_score: 3,
    };

    /// Map a strictness in (0, 1] to its profile
    pub fn from_strictness(strictness: f64) -> Self {
        if strictness >= 0.95 {
            Self::STRICT
        } else if strictness >= 0.90 {
            Self::BALANCED
        } else {
            Self::LIBERAL
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.vol_multiplier.is_finite() && self.vol_multiplier >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "vol_multiplier must be finite and >= 0, got {}",
                self.vol_multiplier
            )));
        }
        if !(self.rsi_low.is_finite() && self.rsi_high.is_finite())
            || self.rsi_low > self.rsi_high
        {
            return Err(EngineError::InvalidConfig(format!(
                "invalid RSI band {}..{}",
                self.rsi_low, self.rsi_high
            )));
        }
        if !(self.near_factor.is_finite() && self.near_factor > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "near_factor must be > 0, got {}",
                self.near_factor
            )));
        }
        if self.required_score > 4 {
            return Err(EngineError::OutOfRange {
                field: "required_score",
                value: self.required_score as f64,
                min: 0.0,
                max: 4.0,
            });
        }
        Ok(())
    }
}

// ============================================================
// ATR STOP MULTIPLIERS
// ============================================================

/// ATR multiples used for the suggested stop of each buy tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrMultipliers {
    pub early: f64,
    pub confirm: f64,
    pub retest: f64,
}

impl Default for AtrMultipliers {
    fn default() -> Self {
        Self {
            early: 2.0,
            confirm: 1.5,
            retest: 1.8,
        }
    }
}

// ============================================================
// STRATEGY CONFIG
// ============================================================

/// Full parameter set for signal classification and backtest replay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Bars in the prior-high window
    pub lookback: Period,
    /// In (0, 1]; higher is stricter
    pub strictness: f64,
    /// Close must exceed `prior_high * breakout_confirm_factor`
    pub breakout_confirm_factor: f64,
    /// Close must sit above `low + level * range`
    pub close_strength_level: Ratio,
    /// Max relative distance of close from EMA20/EMA50 for a retest
    pub retest_zone_pct: f64,
    /// Previous close must exceed `prior_high * two_day_confirm_near`
    pub two_day_confirm_near: f64,
    pub atr_multipliers: AtrMultipliers,
    pub target_pct: f64,
    pub stop_pct: f64,
    /// First bar index the replay may enter on (so EMA200 has history)
    pub warmup_bars: usize,
    pub indicators: IndicatorSettings,
    /// Overrides the profile derived from `strictness`
    pub profile: Option<StrictnessProfile>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(20),
            strictness: 0.90,
            breakout_confirm_factor: 1.003,
            close_strength_level: Ratio::new_const(0.70),
            retest_zone_pct: 0.015,
            two_day_confirm_near: 0.995,
            atr_multipliers: AtrMultipliers::default(),
            target_pct: 0.05,
            stop_pct: 0.02,
            warmup_bars: 220,
            indicators: IndicatorSettings::default(),
            profile: None,
        }
    }
}

impl StrategyConfig {
    /// Profile in effect: the explicit override or the one derived from strictness
    pub fn profile(&self) -> StrictnessProfile {
        self.profile
            .unwrap_or_else(|| StrictnessProfile::from_strictness(self.strictness))
    }

    /// Index of the first bar the replay considers for an entry
    pub fn replay_start(&self) -> usize {
        (self.lookback.get() + 1).max(self.warmup_bars)
    }

    pub fn validate(&self) -> Result<()> {
        if self.strictness.is_nan() || self.strictness <= 0.0 || self.strictness > 1.0 {
            return Err(EngineError::OutOfRange {
                field: "strictness",
                value: self.strictness,
                min: f64::MIN_POSITIVE,
                max: 1.0,
            });
        }
        positive("breakout_confirm_factor", self.breakout_confirm_factor)?;
        non_negative("retest_zone_pct", self.retest_zone_pct)?;
        positive("two_day_confirm_near", self.two_day_confirm_near)?;
        positive("target_pct", self.target_pct)?;
        if !(self.stop_pct > 0.0 && self.stop_pct < 1.0) {
            return Err(EngineError::OutOfRange {
                field: "stop_pct",
                value: self.stop_pct,
                min: 0.0,
                max: 1.0,
            });
        }
        positive("atr_multipliers.early", self.atr_multipliers.early)?;
        positive("atr_multipliers.confirm", self.atr_multipliers.confirm)?;
        positive("atr_multipliers.retest", self.atr_multipliers.retest)?;
        self.profile().validate()
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: f64::INFINITY,
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: f64::INFINITY,
        })
    }
}

// ============================================================
// TESTS
// ============================================================
