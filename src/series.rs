//! Daily price bars and ordered price series.
//!
//! A [`PriceSeries`] is the strict shape the indicator and signal engines consume:
//! ascending by date, one bar per date, every bar internally consistent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{EngineError, OHLCVExt, Result, OHLCV};

// ============================================================
// PRICE BAR
// ============================================================

/// One trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Calendar day, `None` when the source had no usable date column.
    pub date: Option<NaiveDate>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(
        date: Option<NaiveDate>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for PriceBar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

// ============================================================
// PRICE SERIES
// ============================================================

/// Ordered, de-duplicated sequence of [`PriceBar`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from bars in any order.
    ///
    /// Dated bars are sorted ascending and duplicate dates collapse to the bar that
    /// appeared last in the input. Undated bars keep their input order. Mixing dated
    /// and undated bars is rejected.
    pub fn new(mut bars: Vec<PriceBar>) -> Result<Self> {
        let dated = bars.iter().filter(|b| b.date.is_some()).count();
        if dated != 0 && dated != bars.len() {
            return Err(EngineError::InvalidValue(
                "series mixes dated and undated bars",
            ));
        }

        for (index, bar) in bars.iter().enumerate() {
            bar.check()
                .map_err(|reason| EngineError::InvalidBar { index, reason })?;
        }

        if dated != 0 {
            // Stable sort keeps input order among equal dates, so the last one wins below.
            bars.sort_by_key(|b| b.date);
            let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
            for bar in bars {
                match deduped.last_mut() {
                    Some(prev) if prev.date == bar.date => *prev = bar,
                    _ => deduped.push(bar),
                }
            }
            bars = deduped;
        }

        Ok(Self { bars })
    }

    /// Wrap bars that are already known to be ordered and valid.
    #[doc(hidden)]
    pub fn from_sorted_unchecked(bars: Vec<PriceBar>) -> Self {
        Self { bars }
    }

    #[inline]
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }
}

impl AsRef<[PriceBar]> for PriceSeries {
    fn as_ref(&self) -> &[PriceBar] {
        &self.bars
    }
}

impl std::ops::Deref for PriceSeries {
    type Target = [PriceBar];

    fn deref(&self) -> &[PriceBar] {
        &self.bars
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 1, d)
    }

    #[test]
    fn test_bar_check() {
        assert!(PriceBar::new(None, 10.0, 11.0, 9.0, 10.5, 100.0).check().is_ok());
        assert!(PriceBar::new(None, 10.0, 9.5, 9.0, 10.5, 100.0).check().is_err());
        assert!(PriceBar::new(None, 10.0, 11.0, 10.2, 10.5, 100.0).check().is_err());
        assert!(PriceBar::new(None, 0.0, 11.0, 9.0, 10.5, 100.0).check().is_err());
        assert!(PriceBar::new(None, 10.0, 11.0, 9.0, 10.5, -1.0).check().is_err());
        assert!(PriceBar::new(None, f64::NAN, 11.0, 9.0, 10.5, 1.0).check().is_err());
    }

    #[test]
    fn test_series_sorts_and_last_wins() {
        let bars = vec![
            PriceBar::new(day(3), 10.0, 11.0, 9.0, 10.0, 1.0),
            PriceBar::new(day(1), 10.0, 11.0, 9.0, 10.0, 2.0),
            PriceBar::new(day(3), 10.0, 11.0, 9.0, 10.0, 3.0),
            PriceBar::new(day(2), 10.0, 11.0, 9.0, 10.0, 4.0),
        ];
        let series = PriceSeries::new(bars).unwrap();
        assert_eq!(series.len(), 3);
        let dates: Vec<_> = series.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
        assert_eq!(series[2].volume, 3.0);
    }

    #[test]
    fn test_series_keeps_undated_order() {
        let bars = vec![
            PriceBar::new(None, 12.0, 13.0, 11.0, 12.0, 1.0),
            PriceBar::new(None, 10.0, 11.0, 9.0, 10.0, 1.0),
        ];
        let series = PriceSeries::new(bars).unwrap();
        assert_eq!(series[0].open, 12.0);
    }

    #[test]
    fn test_series_rejects_mixed_dates() {
        let bars = vec![
            PriceBar::new(day(1), 10.0, 11.0, 9.0, 10.0, 1.0),
            PriceBar::new(None, 10.0, 11.0, 9.0, 10.0, 1.0),
        ];
        assert!(PriceSeries::new(bars).is_err());
    }

    #[test]
    fn test_series_reports_bad_bar_index() {
        let bars = vec![
            PriceBar::new(None, 10.0, 11.0, 9.0, 10.0, 1.0),
            PriceBar::new(None, 10.0, 9.0, 11.0, 10.0, 1.0),
        ];
        match PriceSeries::new(bars) {
            Err(EngineError::InvalidBar { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
