//! CSV sinks for trade logs and signal records.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::backtest::Trade;
use crate::signal::{SignalReport, SignalState};
use crate::Result;

/// One line of a signal log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRecord {
    pub symbol: String,
    pub date: Option<NaiveDate>,
    pub close: f64,
    pub signal: SignalState,
    pub score: u8,
    pub prior_high: Option<f64>,
    pub rsi14: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub atr14: Option<f64>,
    pub atr_stop: Option<f64>,
}

impl SignalRecord {
    pub fn from_report(symbol: impl Into<String>, report: &SignalReport) -> Self {
        let ind = &report.indicators;
        Self {
            symbol: symbol.into(),
            date: report.date,
            close: report.close,
            signal: report.state,
            score: report.score(),
            prior_high: report.prior_high,
            rsi14: ind.rsi14,
            ema20: ind.ema20,
            ema50: ind.ema50,
            ema200: ind.ema200,
            atr14: ind.atr14,
            atr_stop: report.atr_stop,
        }
    }
}

fn write_rows<W: Write, S: Serialize>(writer: W, rows: &[S], headers: bool) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(headers)
        .from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a trade log with a header row
pub fn write_trades<W: Write>(writer: W, trades: &[Trade]) -> Result<()> {
    write_rows(writer, trades, true)
}

/// Write signal records with a header row
pub fn write_signals<W: Write>(writer: W, records: &[SignalRecord]) -> Result<()> {
    write_rows(writer, records, true)
}

/// Append signal records to a CSV file, writing the header only when the file is new or empty
pub fn append_signals<P: AsRef<Path>>(path: P, records: &[SignalRecord]) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?;
    let empty = file.metadata()?.len() == 0;
    write_rows(file, records, empty)
}
