//! CSV ingestion
//!
//! Turns exchange-style CSV exports into a [`PriceSeries`]. Column names are resolved
//! once through an explicit [`ColumnMapping`]; numeric cells may carry thousands
//! separators or a rupee sign. Rows with an unparseable essential cell or an impossible
//! OHLC shape are dropped and counted, while a missing essential column is fatal.
//!
//! After sorting, large overnight down-jumps are treated as split/bonus events and older
//! bars are rescaled to the latest price basis (see [`adjust_splits`]).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{EngineError, OHLCVExt, PriceBar, PriceSeries, Result};

// ============================================================
// COLUMN MAPPING
// ============================================================

/// Accepted header names per field, matched case-insensitively after trimming.
/// Earlier aliases take priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: Vec<String>,
    pub open: Vec<String>,
    pub high: Vec<String>,
    pub low: Vec<String>,
    pub close: Vec<String>,
    pub volume: Vec<String>,
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnMapping {
    /// Common NSE historical-data and bhavcopy header spellings
    fn default() -> Self {
        Self {
            date: aliases(&["date", "timestamp", "trade date"]),
            open: aliases(&["open", "open price"]),
            high: aliases(&["high", "high price"]),
            low: aliases(&["low", "low price"]),
            close: aliases(&["close", "close price", "closing price", "ltp"]),
            volume: aliases(&[
                "volume",
                "total traded quantity",
                "tottrdqty",
                "shares traded",
                "no. of shares",
            ]),
        }
    }
}

/// Column indices after resolving a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub date: Option<usize>,
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub volume: usize,
}

impl ColumnMapping {
    fn find(names: &[String], headers: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
        })
    }

    /// Resolve header positions. Fails with every missing essential column named.
    pub fn resolve(&self, headers: &[&str]) -> Result<ResolvedColumns> {
        let open = Self::find(&self.open, headers);
        let high = Self::find(&self.high, headers);
        let low = Self::find(&self.low, headers);
        let close = Self::find(&self.close, headers);
        let volume = Self::find(&self.volume, headers);

        match (open, high, low, close, volume) {
            (Some(open), Some(high), Some(low), Some(close), Some(volume)) => Ok(ResolvedColumns {
                date: Self::find(&self.date, headers),
                open,
                high,
                low,
                close,
                volume,
            }),
            _ => {
                let missing = [
                    ("open", open),
                    ("high", high),
                    ("low", low),
                    ("close", close),
                    ("volume", volume),
                ]
                .iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
                Err(EngineError::MissingColumns(missing))
            }
        }
    }
}

// ============================================================
// CELL PARSING
// ============================================================

/// Parse a numeric cell such as `"1,234.50"` or `"₹ 980"`. `None` if unparseable or non-finite.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '₹') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d-%b-%Y", "%d-%m-%Y", "%d/%m/%Y", "%d %b %Y", "%d-%B-%Y", "%Y/%m/%d", "%d.%m.%Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d-%m-%Y %H:%M:%S"];

/// Parse a date cell, day-first where ambiguous.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

// ============================================================
// SPLIT / BONUS ADJUSTMENT
// ============================================================

/// Ratios a detected jump is snapped to
pub const COMMON_SPLIT_RATIOS: [f64; 11] =
    [2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 1.5, 1.25];

/// A detected corporate action
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplitEvent {
    /// First bar on the new price basis
    pub index: usize,
    pub raw_ratio: f64,
    pub used_ratio: f64,
    pub prev_close: f64,
    pub today_close: f64,
}

fn snap_ratio(raw: f64) -> f64 {
    COMMON_SPLIT_RATIOS
        .iter()
        .copied()
        .fold((f64::INFINITY, raw), |(best_diff, best), r| {
            let diff = (r - raw).abs();
            if diff < best_diff {
                (diff, r)
            } else {
                (best_diff, best)
            }
        })
        .1
}

/// Rescale bars before every `close[i-1] / close[i] > trigger` jump.
///
/// Older prices are divided by the snapped ratio and older volume multiplied by it.
/// Bars must be oldest first. A trigger that is not finite and above 1.0 detects nothing.
pub fn adjust_splits(bars: &mut [PriceBar], trigger: f64) -> Vec<SplitEvent> {
    let mut events = Vec::new();
    if !(trigger.is_finite() && trigger > 1.0) {
        return events;
    }

    for idx in 1..bars.len() {
        let prev_close = bars[idx - 1].close;
        let today_close = bars[idx].close;
        if today_close <= 0.0 {
            continue;
        }
        let raw_ratio = prev_close / today_close;
        if raw_ratio.is_nan() || raw_ratio <= trigger {
            continue;
        }

        let used_ratio = snap_ratio(raw_ratio);
        for bar in &mut bars[..idx] {
            bar.open /= used_ratio;
            bar.high /= used_ratio;
            bar.low /= used_ratio;
            bar.close /= used_ratio;
            bar.volume *= used_ratio;
        }

        events.push(SplitEvent {
            index: idx,
            raw_ratio,
            used_ratio,
            prev_close,
            today_close,
        });
    }

    events
}

// ============================================================
// LOADER
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    pub mapping: ColumnMapping,
    pub adjust_splits: bool,
    pub split_ratio_trigger: f64,
    pub delimiter: u8,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            mapping: ColumnMapping::default(),
            adjust_splits: true,
            split_ratio_trigger: 1.8,
            delimiter: b',',
        }
    }
}

impl LoaderOptions {
    /// Reject a split trigger that would rescale ordinary day-to-day moves
    pub fn validate(&self) -> Result<()> {
        let trigger = self.split_ratio_trigger;
        if !(trigger.is_finite() && trigger > 1.0) {
            return Err(EngineError::OutOfRange {
                field: "split_ratio_trigger",
                value: trigger,
                min: 1.0,
                max: f64::MAX,
            });
        }
        Ok(())
    }
}

/// Outcome of loading one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub series: PriceSeries,
    /// Data rows seen, excluding the header
    pub rows_read: usize,
    /// Rows discarded for bad cells or impossible OHLC values
    pub dropped_rows: usize,
    /// Rows collapsed into a later row with the same date
    pub duplicate_dates: usize,
    /// Whether a date column was found
    pub dated: bool,
    pub split_events: Vec<SplitEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct SeriesLoader {
    options: LoaderOptions,
}

impl SeriesLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Load a CSV file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<LoadReport> {
        let file = File::open(path.as_ref())?;
        self.read(file)
    }

    /// Load CSV from any reader
    pub fn read<R: Read>(&self, reader: R) -> Result<LoadReport> {
        self.options.validate()?;

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let header_refs: Vec<&str> = headers.iter().collect();
        let cols = self.options.mapping.resolve(&header_refs)?;

        if cols.date.is_none() {
            tracing::warn!("no date column found; keeping file order");
        }

        let mut bars = Vec::new();
        let mut rows_read = 0;
        let mut dropped_rows = 0;

        for record in rdr.records() {
            let record = match record {
                Ok(r) => r,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    rows_read += 1;
                    dropped_rows += 1;
                    tracing::trace!("skipping malformed record: {e}");
                    continue;
                }
            };
            rows_read += 1;

            match parse_row(&record, &cols) {
                Some(bar) => bars.push(bar),
                None => dropped_rows += 1,
            }
        }

        let before = bars.len();
        let series = PriceSeries::new(bars)?;
        let duplicate_dates = before - series.len();

        let mut bars = series.into_bars();
        let split_events = if self.options.adjust_splits {
            adjust_splits(&mut bars, self.options.split_ratio_trigger)
        } else {
            Vec::new()
        };
        for e in &split_events {
            tracing::info!(
                index = e.index,
                raw_ratio = e.raw_ratio,
                used_ratio = e.used_ratio,
                prev_close = e.prev_close,
                today_close = e.today_close,
                "split/bonus adjusted"
            );
        }

        tracing::debug!(rows_read, dropped_rows, duplicate_dates, "loaded price table");

        Ok(LoadReport {
            series: PriceSeries::from_sorted_unchecked(bars),
            rows_read,
            dropped_rows,
            duplicate_dates,
            dated: cols.date.is_some(),
            split_events,
        })
    }
}

fn parse_row(record: &csv::StringRecord, cols: &ResolvedColumns) -> Option<PriceBar> {
    let date = match cols.date {
        Some(idx) => Some(parse_date(record.get(idx)?)?),
        None => None,
    };
    let num = |idx: usize| record.get(idx).and_then(parse_number);

    let bar = PriceBar {
        date,
        open: num(cols.open)?,
        high: num(cols.high)?,
        low: num(cols.low)?,
        close: num(cols.close)?,
        volume: num(cols.volume)?,
    };
    bar.check().ok()?;
    Some(bar)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,234.50"), Some(1234.5));
        assert_eq!(parse_number(" ₹980 "), Some(980.0));
        assert_eq!(parse_number("12,34,567"), Some(1234567.0));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(parse_date("2024-03-05"), d);
        assert_eq!(parse_date("05-Mar-2024"), d);
        assert_eq!(parse_date("05-MAR-2024"), d);
        assert_eq!(parse_date("05-03-2024"), d);
        assert_eq!(parse_date("05/03/2024"), d);
        assert_eq!(parse_date("2024-03-05 00:00:00"), d);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_resolve_names_missing() {
        let mapping = ColumnMapping::default();
        match mapping.resolve(&["Date", "OPEN", "close"]) {
            Err(EngineError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["high", "low", "volume"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_alias_priority() {
        let mapping = ColumnMapping::default();
        let cols = mapping
            .resolve(&["LTP", "Open Price", "HIGH", "LOW", "Close", "Volume"])
            .unwrap();
        assert_eq!(cols.close, 4);
        assert_eq!(cols.open, 1);
        assert_eq!(cols.date, None);
    }

    #[test]
    fn test_snap_ratio() {
        assert_eq!(snap_ratio(7.9), 8.0);
        assert_eq!(snap_ratio(2.04), 2.0);
        assert_eq!(snap_ratio(1.3), 1.25);
    }

    #[test]
    fn test_adjust_splits() {
        let mut bars = vec![
            PriceBar::new(None, 8000.0, 8400.0, 7900.0, 8400.0, 10.0),
            PriceBar::new(None, 1040.0, 1060.0, 1030.0, 1050.0, 80.0),
        ];
        let events = adjust_splits(&mut bars, 1.8);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].index, 1);
        assert_eq!(events[0].used_ratio, 8.0);
        assert_eq!(bars[0].close, 1050.0);
        assert_eq!(bars[0].volume, 80.0);
        assert_eq!(bars[1].close, 1050.0);
    }

    #[test]
    fn test_no_split_on_normal_moves() {
        let mut bars = vec![
            PriceBar::new(None, 100.0, 101.0, 99.0, 100.0, 10.0),
            PriceBar::new(None, 90.0, 91.0, 80.0, 85.0, 10.0),
        ];
        assert!(adjust_splits(&mut bars, 1.8).is_empty());
        assert_eq!(bars[0].close, 100.0);
    }

    #[test]
    fn test_invalid_trigger_detects_nothing() {
        for trigger in [f64::NAN, 0.5, 1.0, f64::INFINITY] {
            let mut bars = vec![
                PriceBar::new(None, 100.0, 101.0, 99.0, 100.0, 10.0),
                PriceBar::new(None, 100.0, 102.0, 99.0, 101.0, 10.0),
            ];
            assert!(adjust_splits(&mut bars, trigger).is_empty(), "trigger {trigger}");
            assert_eq!(bars[0].close, 100.0);
        }
    }
}
