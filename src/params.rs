//! Parameter metadata for strategy tuning
//!
//! This module describes every tunable of [`StrategyConfig`], enabling:
//! - Grid search over thresholds
//! - Parameter documentation
//! - Building configs from flat key/value maps
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use swingbreak::params::Parameterized;
//! use swingbreak::prelude::*;
//!
//! for param in StrategyConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut params = HashMap::new();
//! params.insert("target_pct", 0.08);
//! let config = StrategyConfig::with_params(&params).unwrap();
//! assert_eq!(config.target_pct, 0.08);
//! ```

use std::collections::HashMap;

use crate::config::StrategyConfig;
use crate::{EngineError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Fraction in 0.0..=1.0
  Ratio,
  /// Positive integer bar count
  Period,
  /// Positive multiplier, may exceed 1.0
  Factor,
}

/// Metadata for a single parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "breakout_confirm_factor")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn factor(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Factor, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    if step <= 0.0 {
      return values;
    }
    let mut k = 0usize;
    loop {
      let v = min + step * k as f64;
      if v > max + step * 1e-9 {
        break;
      }
      values.push(v);
      k += 1;
    }
    values
  }

  /// Validate a value against this parameter's range and type
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(EngineError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(EngineError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Factor => {
        if value <= 0.0 {
          return Err(EngineError::InvalidValue("Factor must be > 0"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Types that can be described by and built from flat parameter maps
pub trait Parameterized: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a value with parameters from a HashMap
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

const STRATEGY_PARAMS: &[ParamMeta] = &[
  ParamMeta::period("lookback", 20.0, (10.0, 60.0, 5.0), "Bars in the prior-high window"),
  ParamMeta::ratio("strictness", 0.90, (0.80, 1.0, 0.05), "Selects the threshold profile"),
  ParamMeta::factor(
    "breakout_confirm_factor",
    1.003,
    (1.0, 1.01, 0.001),
    "Close must exceed prior high times this",
  ),
  ParamMeta::ratio(
    "close_strength_level",
    0.70,
    (0.5, 0.9, 0.05),
    "Close must sit above this fraction of the bar range",
  ),
  ParamMeta::ratio(
    "retest_zone_pct",
    0.015,
    (0.005, 0.03, 0.005),
    "Distance from EMA20/50 for a retest",
  ),
  ParamMeta::factor(
    "two_day_confirm_near",
    0.995,
    (0.98, 1.0, 0.005),
    "Previous close must exceed prior high times this",
  ),
  ParamMeta::ratio("target_pct", 0.05, (0.02, 0.15, 0.01), "Profit target above entry"),
  ParamMeta::ratio("stop_pct", 0.02, (0.01, 0.08, 0.01), "Stop distance below entry"),
  ParamMeta::factor("atr_mult_early", 2.0, (1.0, 3.0, 0.25), "ATR stop multiple for EARLY_BUY"),
  ParamMeta::factor("atr_mult_confirm", 1.5, (1.0, 3.0, 0.25), "ATR stop multiple for CONFIRM_BUY"),
  ParamMeta::factor("atr_mult_retest", 1.8, (1.0, 3.0, 0.2), "ATR stop multiple for RETEST_BUY"),
  ParamMeta::period(
    "warmup_bars",
    220.0,
    (50.0, 300.0, 10.0),
    "First bar index eligible for entry",
  ),
];

impl Parameterized for StrategyConfig {
  fn param_meta() -> &'static [ParamMeta] {
    STRATEGY_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let unknown = params.keys().find(|k| !STRATEGY_PARAMS.iter().any(|m| m.name == **k));
    if let Some(unknown) = unknown {
      return Err(EngineError::InvalidConfig(format!("unknown parameter: {unknown}")));
    }

    let d = StrategyConfig::default();
    let m = d.atr_multipliers;
    let mut config = StrategyConfig {
      lookback: get_period(params, "lookback", d.lookback.get())?,
      strictness: get_factor(params, "strictness", d.strictness),
      breakout_confirm_factor: get_factor(
        params,
        "breakout_confirm_factor",
        d.breakout_confirm_factor,
      ),
      close_strength_level: get_ratio(
        params,
        "close_strength_level",
        d.close_strength_level.get(),
      )?,
      retest_zone_pct: get_factor(params, "retest_zone_pct", d.retest_zone_pct),
      two_day_confirm_near: get_factor(params, "two_day_confirm_near", d.two_day_confirm_near),
      target_pct: get_factor(params, "target_pct", d.target_pct),
      stop_pct: get_factor(params, "stop_pct", d.stop_pct),
      warmup_bars: get_period(params, "warmup_bars", d.warmup_bars)?.get(),
      ..d
    };
    config.atr_multipliers.early = get_factor(params, "atr_mult_early", m.early);
    config.atr_multipliers.confirm = get_factor(params, "atr_mult_confirm", m.confirm);
    config.atr_multipliers.retest = get_factor(params, "atr_mult_retest", m.retest);

    config.validate()?;
    Ok(config)
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value.is_nan() || value < 1.0 || value.fract() != 0.0 {
    return Err(EngineError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to get a raw multiplier from params with default fallback
pub fn get_factor(params: &HashMap<&str, f64>, key: &str, default: f64) -> f64 {
  params.get(key).copied().unwrap_or(default)
}

// ============================================================
// TESTS
// ============================================================
