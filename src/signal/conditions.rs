//! Per-bar condition evaluation.

use super::{Conditions, SignalReport, SignalState};
use crate::config::{AtrMultipliers, StrategyConfig, StrictnessProfile};
use crate::indicators::{IndicatorFrame, IndicatorRow};
use crate::{OHLCVExt, OHLCV};

/// Highest high over `bars[end - lookback..end]`, `None` if the window does not fit.
#[inline]
pub fn prior_high<T: OHLCV>(bars: &[T], end: usize, lookback: usize) -> Option<f64> {
    if lookback == 0 || end < lookback || end > bars.len() {
        return None;
    }
    bars[end - lookback..end]
        .iter()
        .map(|b| b.high())
        .reduce(f64::max)
}

/// Close sits strictly above `low + level * range`. A zero-range bar is never strong.
#[inline]
pub fn close_strong<T: OHLCV>(bar: &T, level: f64) -> bool {
    let range = bar.range();
    range > 0.0 && bar.close() > bar.low() + level * range
}

/// Close within `pct` (relative) of `reference`.
#[inline]
fn within(close: f64, reference: f64, pct: f64) -> bool {
    reference > 0.0 && (close - reference).abs() / reference <= pct
}

/// Two-day build-up check at `index`.
///
/// Uses the window that ends before the previous bar: today's close must clear it by
/// the breakout factor and yesterday's close must already be within
/// `two_day_confirm_near` of it.
pub fn two_day_confirm<T: OHLCV>(bars: &[T], index: usize, config: &StrategyConfig) -> bool {
    let lookback = config.lookback.get();
    if index < lookback + 2 || index >= bars.len() {
        return false;
    }
    let Some(threshold) = prior_high(bars, index - 1, lookback) else {
        return false;
    };
    let today = bars[index].close() > threshold * config.breakout_confirm_factor;
    let yesterday = bars[index - 1].close() > threshold * config.two_day_confirm_near;
    today && yesterday
}

/// Suggested stop `close - atr * multiplier` for a buy tier.
///
/// `None` for non-buy states and when ATR is undefined or not positive.
pub fn atr_stop(
    close: f64,
    atr: Option<f64>,
    state: SignalState,
    mults: &AtrMultipliers,
) -> Option<f64> {
    let atr = atr.filter(|a| a.is_finite() && *a > 0.0)?;
    let mult = state.atr_multiplier(mults)?;
    Some(close - atr * mult)
}

/// Build the condition vector for `bar` given its indicator row and prior high.
///
/// Returns `None` if any indicator the rules read is undefined.
pub fn evaluate_conditions<T: OHLCV>(
    bar: &T,
    row: &IndicatorRow,
    prior_high: f64,
    config: &StrategyConfig,
    profile: &StrictnessProfile,
) -> Option<Conditions> {
    let ema20 = row.ema20?;
    let ema50 = row.ema50?;
    let ema200 = row.ema200?;
    let rsi = row.rsi14?;
    let avg_volume = row.avg_volume20?;
    let close = bar.close();

    Some(Conditions {
        breakout: close > prior_high * config.breakout_confirm_factor,
        near_breakout: close > prior_high * profile.near_factor,
        volume_ok: bar.volume() > profile.vol_multiplier * avg_volume,
        early_trend_ok: ema20 > ema50 && close > ema50,
        above_long_trend: close > ema200,
        rsi_ok: (profile.rsi_low..=profile.rsi_high).contains(&rsi),
        close_strong: close_strong(bar, config.close_strength_level.get()),
        retest_zone: within(close, ema20, config.retest_zone_pct)
            || within(close, ema50, config.retest_zone_pct),
        two_day_confirm: false,
    })
}

/// Evaluate and classify the bar at `index`.
///
/// Bars without a full lookback window or with undefined indicators are `NoTrade`.
pub fn evaluate_at<T: OHLCV>(
    bars: &[T],
    frame: &IndicatorFrame,
    index: usize,
    config: &StrategyConfig,
    profile: &StrictnessProfile,
) -> SignalReport {
    let Some(bar) = bars.get(index) else {
        return SignalReport {
            index,
            ..Default::default()
        };
    };
    let row = frame.row(index).unwrap_or_default();
    let prior = prior_high(bars, index, config.lookback.get());

    let conditions = prior
        .and_then(|ph| evaluate_conditions(bar, &row, ph, config, profile))
        .map(|c| Conditions {
            two_day_confirm: two_day_confirm(bars, index, config),
            ..c
        });

    let state = conditions
        .map(|c| SignalState::classify(&c, profile.required_score))
        .unwrap_or_default();

    SignalReport {
        index,
        date: bar.date(),
        close: bar.close(),
        prior_high: prior,
        conditions,
        state,
        indicators: row,
        atr_stop: atr_stop(bar.close(), row.atr14, state, &config.atr_multipliers),
    }
}
