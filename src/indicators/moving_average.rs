//! Exponential and simple moving averages.

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded by the first value.
///
/// Defined from the first element onward; values before roughly `span` elements are
/// only an approximation of the long-run average. A `span` of zero yields all `None`.
pub fn ema(values: &[f64], span: usize) -> Vec<Option<f64>> {
    if span == 0 {
        return vec![None; values.len()];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &x in values {
        let next = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        prev = Some(next);
        out.push(Some(next));
    }

    out
}

/// Trailing simple mean over `window` elements, `None` until the window is full.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let len = values.len();
    let mut out = vec![None; len];
    if window == 0 {
        return out;
    }

    for i in (window - 1)..len {
        let slice = &values[i + 1 - window..=i];
        out[i] = Some(slice.iter().sum::<f64>() / window as f64);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_seed_and_recurrence() {
        let out = ema(&[10.0, 20.0, 30.0], 3);
        let alpha = 0.5;
        assert_eq!(out[0], Some(10.0));
        assert!((out[1].unwrap() - (alpha * 20.0 + 5.0)).abs() < 1e-12);
        assert!((out[2].unwrap() - (alpha * 30.0 + 0.5 * 15.0)).abs() < 1e-12);
    }

    #[test]
    fn test_ema_constant_input() {
        let out = ema(&[7.0; 50], 20);
        assert!(out.iter().all(|v| *v == Some(7.0)));
    }

    #[test]
    fn test_rolling_mean_warmup() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0));
        assert_eq!(out[3], Some(3.0));
    }

    #[test]
    fn test_zero_window() {
        assert!(rolling_mean(&[1.0, 2.0], 0).iter().all(Option::is_none));
        assert!(ema(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }
}
