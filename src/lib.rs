//! # swingbreak
//!
//! Breakout signal classification and forward-walking backtests for daily OHLCV data.
//!
//! The pipeline is one-directional: bars → [`IndicatorFrame`] (EMA 20/50/200, Wilder
//! RSI 14, Wilder ATR 14, 20-bar average volume) → per-bar [`SignalState`] → optional
//! trade replay with a fixed target and stop.
//!
//! ## Quick Start
//!
//! ```rust
//! use swingbreak::prelude::*;
//!
//! // Any type implementing OHLCV works; PriceBar is the bundled one.
//! let bars: Vec<PriceBar> = (0..60)
//!     .map(|i| {
//!         let c = 100.0 + i as f64 * 0.1;
//!         PriceBar::new(None, c - 0.05, c + 0.05, c - 0.1, c, 1_000.0)
//!     })
//!     .collect();
//!
//! let engine = EngineBuilder::new()
//!     .strictness(0.90)
//!     .build()
//!     .unwrap();
//!
//! let latest = engine.signal(&bars).unwrap();
//! println!("{} (stop: {:?})", latest.state, latest.atr_stop);
//!
//! let report = engine.backtest(&bars).unwrap();
//! assert!(report.trades.is_empty());
//! ```

pub mod backtest;
pub mod config;
pub mod indicators;
pub mod loader;
pub mod params;
pub mod report;
pub mod series;
pub mod signal;

pub mod prelude {
    pub use crate::{
        // Backtest
        backtest::{BacktestReport, BacktestSummary, ExitReason, OpenTrade, Outcome, Trade},
        // Parallel
        backtest_parallel,
        // Configuration
        config::{AtrMultipliers, StrategyConfig, StrictnessProfile},
        // Indicators
        indicators::{IndicatorFrame, IndicatorRow, IndicatorSettings, RsiMethod},
        // Loading
        loader::{ColumnMapping, LoadReport, LoaderOptions, SeriesLoader, SplitEvent},
        analyze_files,
        scan_parallel,
        // Data
        series::{PriceBar, PriceSeries},
        // Signals
        signal::{Conditions, SignalReport, SignalState},
        Analysis,
        BacktestResult,
        // Engine
        EngineBuilder,
        // Errors
        EngineError,
        FileAnalysis,
        Period,
        Ratio,
        Result,
        ScanError,
        ScanResult,
        SignalEngine,
        OHLCVExt,
        OHLCV,
    };
}

pub use indicators::IndicatorFrame;
pub use series::{PriceBar, PriceSeries};
pub use signal::SignalState;

use std::path::Path;

use chrono::NaiveDate;

use backtest::BacktestReport;
use config::{StrategyConfig, StrictnessProfile};
use indicators::IndicatorSettings;
use loader::{LoadReport, SeriesLoader};
use signal::SignalReport;

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced to callers. Row- and cell-level problems never show up here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(EngineError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(EngineError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(EngineError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn date(&self) -> Option<NaiveDate> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Check finite positive prices, non-negative volume and a consistent high/low envelope
    fn check(&self) -> std::result::Result<(), &'static str> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err("non-finite price");
        }
        if prices.iter().any(|&p| p <= 0.0) {
            return Err("non-positive price");
        }
        let volume = self.volume();
        if !volume.is_finite() || volume < 0.0 {
            return Err("invalid volume");
        }
        if self.high() < self.open().max(self.close()).max(self.low()) {
            return Err("high below open/close/low");
        }
        if self.low() > self.open().min(self.close()).min(self.high()) {
            return Err("low above open/close/high");
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// SIGNAL ENGINE
// ============================================================

/// Latest-bar signal and full replay over the same indicator frame
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Analysis {
    pub signal: SignalReport,
    pub backtest: BacktestReport,
}

/// Indicator computation, classification and replay for one configuration
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: StrategyConfig,
    profile: StrictnessProfile,
    validate_data: bool,
}

impl SignalEngine {
    /// Create an engine, validating the configuration
    pub fn new(config: StrategyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            profile: config.profile(),
            config,
            validate_data: false,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn profile(&self) -> &StrictnessProfile {
        &self.profile
    }

    // ===========================================
    // LOW-LEVEL: Primitives
    // ===========================================

    /// Compute the indicator frame for `bars`.
    /// Callers can store it and reuse it with [`SignalEngine::evaluate_at`].
    #[inline]
    pub fn compute_indicators<T: OHLCV>(&self, bars: &[T]) -> IndicatorFrame {
        IndicatorFrame::compute(bars, &self.config.indicators)
    }

    /// Evaluate the bar at `index` against a precomputed frame.
    #[inline]
    pub fn evaluate_at<T: OHLCV>(
        &self,
        bars: &[T],
        frame: &IndicatorFrame,
        index: usize,
    ) -> SignalReport {
        signal::evaluate_at(bars, frame, index, &self.config, &self.profile)
    }

    // ===========================================
    // HIGH-LEVEL: Whole series
    // ===========================================

    /// Classify the most recent bar.
    pub fn signal<T: OHLCV>(&self, bars: &[T]) -> Result<SignalReport> {
        self.prepare(bars)?;
        if bars.is_empty() {
            return Err(EngineError::InsufficientData { need: 1, got: 0 });
        }
        let frame = self.compute_indicators(bars);
        Ok(self.evaluate_at(bars, &frame, bars.len() - 1))
    }

    /// Full report for every bar.
    pub fn evaluate_all<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<SignalReport>> {
        self.prepare(bars)?;
        let frame = self.compute_indicators(bars);
        Ok((0..bars.len())
            .map(|i| self.evaluate_at(bars, &frame, i))
            .collect())
    }

    /// Label every bar.
    pub fn classify_all<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<SignalState>> {
        Ok(self.evaluate_all(bars)?.into_iter().map(|r| r.state).collect())
    }

    /// Replay the series and collect closed trades.
    pub fn backtest<T: OHLCV>(&self, bars: &[T]) -> Result<BacktestReport> {
        self.prepare(bars)?;
        let frame = self.compute_indicators(bars);
        Ok(backtest::replay(bars, &frame, &self.config, &self.profile))
    }

    /// Latest-bar signal plus replay, sharing one indicator frame.
    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> Result<Analysis> {
        self.prepare(bars)?;
        if bars.is_empty() {
            return Err(EngineError::InsufficientData { need: 1, got: 0 });
        }
        let frame = self.compute_indicators(bars);
        Ok(Analysis {
            signal: self.evaluate_at(bars, &frame, bars.len() - 1),
            backtest: backtest::replay(bars, &frame, &self.config, &self.profile),
        })
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn prepare<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        if !self.validate_data {
            return Ok(());
        }
        for (index, bar) in bars.iter().enumerate() {
            bar.check()
                .map_err(|reason| EngineError::InvalidBar { index, reason })?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating SignalEngine instances
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: StrategyConfig,
    validate_data: bool,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: StrategyConfig) -> Self {
        Self {
            config,
            validate_data: false,
        }
    }

    pub fn lookback(mut self, bars: usize) -> Self {
        // Zero is caught by build()
        self.config.lookback = Period::new_const(bars);
        self
    }

    pub fn strictness(mut self, strictness: f64) -> Self {
        self.config.strictness = strictness;
        self
    }

    /// Use explicit thresholds instead of the strictness-derived profile
    pub fn profile(mut self, profile: StrictnessProfile) -> Self {
        self.config.profile = Some(profile);
        self
    }

    pub fn target_pct(mut self, pct: f64) -> Self {
        self.config.target_pct = pct;
        self
    }

    pub fn stop_pct(mut self, pct: f64) -> Self {
        self.config.stop_pct = pct;
        self
    }

    pub fn warmup_bars(mut self, bars: usize) -> Self {
        self.config.warmup_bars = bars;
        self
    }

    pub fn indicators(mut self, settings: IndicatorSettings) -> Self {
        self.config.indicators = settings;
        self
    }

    /// Enable/disable per-bar validation before each run
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.validate_data = enable;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<SignalEngine> {
        if self.config.lookback.get() == 0 {
            return Err(EngineError::InvalidValue("Period must be > 0"));
        }
        let mut engine = SignalEngine::new(self.config)?;
        engine.validate_data = self.validate_data;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Latest-bar signal for a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub signal: SignalReport,
}

/// Replay result for a single instrument
#[derive(Debug)]
pub struct BacktestResult {
    pub symbol: String,
    pub report: BacktestReport,
}

/// Load summary plus analysis for one CSV file
#[derive(Debug)]
pub struct FileAnalysis {
    pub symbol: String,
    pub load: LoadReport,
    pub analysis: Analysis,
}

/// Error from processing a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: EngineError,
}

fn split_results<R>(
    results: Vec<std::result::Result<R, ScanError>>,
) -> (Vec<R>, Vec<ScanError>) {
    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => {
                tracing::warn!(symbol = %e.symbol, error = %e.error, "symbol skipped");
                errors.push(e);
            }
        }
    }

    (successes, errors)
}

/// Parallel latest-bar classification of multiple instruments
pub fn scan_parallel<'a, T, I>(
    engine: &SignalEngine,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .signal(bars)
                .map(|signal| ScanResult {
                    symbol: symbol.to_string(),
                    signal,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    split_results(results)
}

/// Parallel replay of multiple instruments
pub fn backtest_parallel<'a, T, I>(
    engine: &SignalEngine,
    instruments: I,
) -> (Vec<BacktestResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .backtest(bars)
                .map(|report| BacktestResult {
                    symbol: symbol.to_string(),
                    report,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    split_results(results)
}

/// Load and analyze CSV files in parallel. The symbol is the file stem.
pub fn analyze_files<P>(
    engine: &SignalEngine,
    loader: &SeriesLoader,
    paths: &[P],
) -> (Vec<FileAnalysis>, Vec<ScanError>)
where
    P: AsRef<Path> + Sync,
{
    let results: Vec<_> = paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let symbol = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            loader
                .load(path)
                .and_then(|load| {
                    let analysis = engine.analyze(load.series.bars())?;
                    Ok((load, analysis))
                })
                .map(|(load, analysis)| FileAnalysis {
                    symbol: symbol.clone(),
                    load,
                    analysis,
                })
                .map_err(|error| ScanError { symbol, error })
        })
        .collect();

    split_results(results)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Test OHLCV bar
    #[derive(Debug, Clone)]
    struct Bar {
        o: f64,
        h: f64,
        l: f64,
        c: f64,
        v: f64,
    }

    impl Bar {
        fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
            Self {
                o,
                h,
                l,
                c,
                v: 1000.0,
            }
        }
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.o
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            self.c
        }

        fn volume(&self) -> f64 {
            self.v
        }
    }

    fn make_uptrend_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.5;
                Bar::new(base, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect()
    }

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(0.5).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
        assert!(Ratio::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(100).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let bar = Bar::new(100.0, 110.0, 90.0, 105.0);
        assert_eq!(bar.range(), 20.0);
        assert!(bar.check().is_ok());

        let flat = Bar::new(100.0, 100.0, 100.0, 100.0);
        assert_eq!(flat.range(), 0.0);

        let broken = Bar::new(100.0, 95.0, 90.0, 92.0);
        assert!(broken.check().is_err());
    }

    #[test]
    fn test_engine_builder() {
        assert!(EngineBuilder::new().build().is_ok());
        assert!(EngineBuilder::new().lookback(0).build().is_err());
        assert!(EngineBuilder::new().strictness(0.0).build().is_err());
        assert!(EngineBuilder::new().stop_pct(-0.01).build().is_err());

        let engine = EngineBuilder::new().strictness(0.97).build().unwrap();
        assert_eq!(engine.profile().required_score, 4);
    }

    #[test]
    fn test_empty_signal_is_error() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars: Vec<Bar> = vec![];
        assert!(matches!(
            engine.signal(&bars),
            Err(EngineError::InsufficientData { need: 1, got: 0 })
        ));
        assert!(engine.backtest(&bars).unwrap().is_empty());
    }

    #[test]
    fn test_short_history_is_no_trade() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars = make_uptrend_bars(10);
        let report = engine.signal(&bars).unwrap();
        assert_eq!(report.state, SignalState::NoTrade);
        assert!(report.conditions.is_none());
        assert!(report.atr_stop.is_none());
    }

    #[test]
    fn test_classify_all_length() {
        let engine = EngineBuilder::new().build().unwrap();
        let bars = make_uptrend_bars(40);
        assert_eq!(engine.classify_all(&bars).unwrap().len(), 40);
    }

    #[test]
    fn test_validate_data() {
        let engine = EngineBuilder::new().validate_data(true).build().unwrap();
        let mut bars = make_uptrend_bars(5);
        bars[3] = Bar::new(100.0, 90.0, 95.0, 100.0);
        match engine.signal(&bars) {
            Err(EngineError::InvalidBar { index, .. }) => assert_eq!(index, 3),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_columns_message() {
        let err = EngineError::MissingColumns(vec!["high".into(), "volume".into()]);
        assert_eq!(err.to_string(), "Missing required columns: high, volume");
    }

    #[test]
    fn test_parallel_scan() {
        let engine = EngineBuilder::new().validate_data(true).build().unwrap();

        let good = make_uptrend_bars(60);
        let mut bad = make_uptrend_bars(60);
        bad[10] = Bar::new(100.0, 90.0, 95.0, 100.0);
        let empty: Vec<Bar> = Vec::new();

        let instruments: Vec<(&str, &[Bar])> = vec![
            ("INFY", good.as_slice()),
            ("BROKEN", bad.as_slice()),
            ("EMPTY", empty.as_slice()),
        ];

        let (results, errors) = scan_parallel(&engine, instruments);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol, "INFY");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_parallel_backtest() {
        let engine = EngineBuilder::new().build().unwrap();
        let a = make_uptrend_bars(30);
        let b = make_uptrend_bars(300);
        let instruments: Vec<(&str, &[Bar])> = vec![("A", a.as_slice()), ("B", b.as_slice())];
        let (results, errors) = backtest_parallel(&engine, instruments);
        assert_eq!(results.len(), 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_analyze_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("RELIANCE.csv");
        let bad = dir.path().join("NOCOLS.csv");

        let mut csv = String::from("date,open,high,low,close,volume\n");
        for i in 0..30 {
            let c = 100.0 + i as f64;
            csv.push_str(&format!("2024-01-{:02},{c},{},{},{c},1000\n", i + 1, c + 1.0, c - 1.0));
        }
        std::fs::write(&good, csv).unwrap();
        std::fs::write(&bad, "date,close\n2024-01-01,10\n").unwrap();

        let engine = EngineBuilder::new().build().unwrap();
        let loader = SeriesLoader::default();
        let (results, errors) = analyze_files(&engine, &loader, &[good, bad]);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol, "RELIANCE");
        assert_eq!(results[0].load.series.len(), 30);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "NOCOLS");
        assert!(matches!(errors[0].error, EngineError::MissingColumns(_)));
    }
}
