//! Causal technical indicators
//!
//! Every column of an [`IndicatorFrame`] is aligned 1:1 with the input bars and the
//! value at index `i` only depends on bars `0..=i`. Cells inside an indicator's
//! warm-up period are `None`.
//!
//! - **EMA** 20 / 50 / 200 of close, seeded by the first close
//! - **RSI** 14, Wilder smoothing (or simple means, see [`RsiMethod`])
//! - **ATR** 14, Wilder smoothing of true range
//! - **Average volume** over a trailing 20-bar window

pub mod moving_average;
pub mod wilder;

pub use moving_average::*;
pub use wilder::*;

use serde::{Deserialize, Serialize};

use crate::{Period, OHLCV};

/// How RSI averages gains and losses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiMethod {
    #[default]
    Wilder,
    Simple,
}

/// Periods used to build an [`IndicatorFrame`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub ema_fast: Period,
    pub ema_mid: Period,
    pub ema_long: Period,
    pub rsi_period: Period,
    pub rsi_method: RsiMethod,
    pub atr_period: Period,
    pub volume_window: Period,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            ema_fast: Period::new_const(20),
            ema_mid: Period::new_const(50),
            ema_long: Period::new_const(200),
            rsi_period: Period::new_const(14),
            rsi_method: RsiMethod::Wilder,
            atr_period: Period::new_const(14),
            volume_window: Period::new_const(20),
        }
    }
}

/// Indicator values at a single bar
///
/// Field names follow the default periods. The values always come from the
/// [`IndicatorSettings`] the frame was computed with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub rsi14: Option<f64>,
    pub atr14: Option<f64>,
    pub avg_volume20: Option<f64>,
}

/// Column-oriented indicator table aligned with a bar slice
///
/// Column names follow the default periods; each holds the period set in
/// [`IndicatorSettings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorFrame {
    /// EMA over `ema_fast`
    pub ema20: Vec<Option<f64>>,
    /// EMA over `ema_mid`
    pub ema50: Vec<Option<f64>>,
    /// EMA over `ema_long`
    pub ema200: Vec<Option<f64>>,
    /// RSI over `rsi_period`
    pub rsi14: Vec<Option<f64>>,
    /// ATR over `atr_period`
    pub atr14: Vec<Option<f64>>,
    /// Mean volume over `volume_window`
    pub avg_volume20: Vec<Option<f64>>,
}

impl IndicatorFrame {
    /// Compute all columns for `bars`. Never fails; short input just leaves more cells `None`.
    pub fn compute<T: OHLCV>(bars: &[T], settings: &IndicatorSettings) -> Self {
        let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume()).collect();

        let rsi14 = match settings.rsi_method {
            RsiMethod::Wilder => rsi_wilder(&closes, settings.rsi_period.get()),
            RsiMethod::Simple => rsi_simple(&closes, settings.rsi_period.get()),
        };

        Self {
            ema20: ema(&closes, settings.ema_fast.get()),
            ema50: ema(&closes, settings.ema_mid.get()),
            ema200: ema(&closes, settings.ema_long.get()),
            rsi14,
            atr14: atr_wilder(bars, settings.atr_period.get()),
            avg_volume20: rolling_mean(&volumes, settings.volume_window.get()),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ema20.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ema20.is_empty()
    }

    /// Row view at `index`, `None` if out of bounds.
    pub fn row(&self, index: usize) -> Option<IndicatorRow> {
        (index < self.len()).then(|| IndicatorRow {
            ema20: self.ema20[index],
            ema50: self.ema50[index],
            ema200: self.ema200[index],
            rsi14: self.rsi14[index],
            atr14: self.atr14[index],
            avg_volume20: self.avg_volume20[index],
        })
    }
}
