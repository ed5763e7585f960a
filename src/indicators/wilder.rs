//! Wilder-smoothed indicators: RSI and ATR.
//!
//! Wilder smoothing is `avg[i] = avg[i-1] + (x[i] - avg[i-1]) / period`, an EMA with
//! `alpha = 1 / period`. Both indicators seed the average with the first observation
//! and hide the first `period` bars as warm-up.

use crate::OHLCV;

/// Raw Wilder recurrence seeded by `values[0]`. No warm-up masking.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if period == 0 {
        return out;
    }

    let n = period as f64;
    for &x in values {
        let next = match out.last() {
            None => x,
            Some(&prev) => prev + (x - prev) / n,
        };
        out.push(next);
    }
    out
}

/// RSI from averaged gain and loss.
///
/// A zero average gain gives 0 (this also covers a completely flat window), a zero
/// average loss with positive gain gives exactly 100.
#[inline]
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 {
        0.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Split close-to-close deltas into (gains, losses). Element `k` is the move into bar `k + 1`.
fn gains_losses(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    closes
        .windows(2)
        .map(|w| {
            let delta = w[1] - w[0];
            (delta.max(0.0), (-delta).max(0.0))
        })
        .unzip()
}

/// Wilder RSI. Defined for bar indices `>= period`.
pub fn rsi_wilder(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let len = closes.len();
    let mut out = vec![None; len];
    if period == 0 || len <= period {
        return out;
    }

    let (gains, losses) = gains_losses(closes);
    let avg_gain = wilder_smooth(&gains, period);
    let avg_loss = wilder_smooth(&losses, period);

    for i in period..len {
        out[i] = Some(rsi_from_averages(avg_gain[i - 1], avg_loss[i - 1]));
    }
    out
}

/// RSI over simple trailing means of the last `period` gains and losses.
/// Defined for bar indices `>= period`.
pub fn rsi_simple(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let len = closes.len();
    let mut out = vec![None; len];
    if period == 0 || len <= period {
        return out;
    }

    let (gains, losses) = gains_losses(closes);
    let n = period as f64;

    for i in period..len {
        let window = i - period..i;
        let g = gains[window.clone()].iter().sum::<f64>() / n;
        let l = losses[window].iter().sum::<f64>() / n;
        out[i] = Some(rsi_from_averages(g, l));
    }
    out
}

/// True range per bar. The first bar has no previous close, so its range is `high - low`.
pub fn true_range<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let hl = bar.high() - bar.low();
        let tr = match i.checked_sub(1).map(|p| bars[p].close()) {
            None => hl,
            Some(prev_close) => hl
                .max((bar.high() - prev_close).abs())
                .max((bar.low() - prev_close).abs()),
        };
        out.push(tr);
    }
    out
}

/// Wilder ATR. Defined for bar indices `>= period`.
pub fn atr_wilder<T: OHLCV>(bars: &[T], period: usize) -> Vec<Option<f64>> {
    let len = bars.len();
    let mut out = vec![None; len];
    if period == 0 {
        return out;
    }

    let smoothed = wilder_smooth(&true_range(bars), period);
    for i in period..len {
        out[i] = Some(smoothed[i]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PriceBar;

    fn bar(o: f64, h: f64, l: f64, c: f64) -> PriceBar {
        PriceBar::new(None, o, h, l, c, 1000.0)
    }

    #[test]
    fn test_wilder_smooth_recurrence() {
        let out = wilder_smooth(&[10.0, 0.0, 0.0], 2);
        assert_eq!(out, vec![10.0, 5.0, 2.5]);
    }

    #[test]
    fn test_rsi_warmup_length() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i % 3) as f64).collect();
        let rsi = rsi_wilder(&closes, 14);
        assert!(rsi[..14].iter().all(Option::is_none));
        assert!(rsi[14..].iter().all(Option::is_some));
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rsi = rsi_wilder(&closes, 14);
        assert_eq!(rsi[29], Some(100.0));
    }

    #[test]
    fn test_rsi_all_losses_is_0() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi_wilder(&closes, 14)[29], Some(0.0));
        assert_eq!(rsi_simple(&closes, 14)[29], Some(0.0));
    }

    #[test]
    fn test_rsi_flat_is_0() {
        let closes = vec![50.0; 30];
        assert_eq!(rsi_wilder(&closes, 14)[20], Some(0.0));
    }

    #[test]
    fn test_rsi_simple_alternating() {
        // +1, -1, +1, ... over 4 deltas: avg gain == avg loss -> 50
        let closes = vec![10.0, 11.0, 10.0, 11.0, 10.0];
        let rsi = rsi_simple(&closes, 4);
        assert_eq!(rsi[4], Some(50.0));
    }

    #[test]
    fn test_true_range_uses_prev_close() {
        let bars = vec![bar(10.0, 11.0, 9.0, 10.0), bar(13.0, 14.0, 12.5, 13.5)];
        let tr = true_range(&bars);
        assert_eq!(tr[0], 2.0);
        assert_eq!(tr[1], 4.0); // gap up: high - prev close
    }

    #[test]
    fn test_atr_flat_is_zero() {
        let bars = vec![bar(100.0, 100.0, 100.0, 100.0); 20];
        let atr = atr_wilder(&bars, 14);
        assert!(atr[..14].iter().all(Option::is_none));
        assert!(atr[14..].iter().all(|v| *v == Some(0.0)));
    }
}
