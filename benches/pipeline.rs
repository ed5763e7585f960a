//! Benchmarks for indicator computation, classification and replay.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use swingbreak::prelude::*;

/// Generate realistic deterministic bars
fn generate_bars(n: usize) -> Vec<PriceBar> {
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 0.98; // Deterministic "random"
    let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;
    let volume = 10_000.0 + ((i * 31) % 17) as f64 * 1_000.0;

    let o = price;
    let c = (price + change).max(1.0);
    let h = o.max(c) + volatility * 0.5;
    let l = (o.min(c) - volatility * 0.5).max(0.5);

    bars.push(PriceBar::new(None, o, h, l, c, volume));
    price = c;
  }

  bars
}

fn bench_indicators(c: &mut Criterion) {
  let mut group = c.benchmark_group("indicators");
  let settings = IndicatorSettings::default();

  for size in [250, 1000, 5000] {
    let bars = generate_bars(size);
    group.bench_with_input(BenchmarkId::from_parameter(size), &bars, |b, bars| {
      b.iter(|| IndicatorFrame::compute(black_box(bars), &settings))
    });
  }

  group.finish();
}

fn bench_classify(c: &mut Criterion) {
  let engine = EngineBuilder::new().build().unwrap();
  let bars = generate_bars(1000);

  c.bench_function("classify_all_1000", |b| {
    b.iter(|| engine.classify_all(black_box(&bars)).unwrap())
  });

  c.bench_function("signal_latest_1000", |b| b.iter(|| engine.signal(black_box(&bars)).unwrap()));
}

fn bench_backtest(c: &mut Criterion) {
  let mut group = c.benchmark_group("backtest");

  for strictness in [0.85, 0.90, 0.97] {
    let engine = EngineBuilder::new().strictness(strictness).build().unwrap();
    let bars = generate_bars(2000);
    group.bench_with_input(BenchmarkId::from_parameter(strictness), &bars, |b, bars| {
      b.iter(|| engine.backtest(black_box(bars)).unwrap())
    });
  }

  group.finish();
}

fn bench_parallel(c: &mut Criterion) {
  let engine = EngineBuilder::new().build().unwrap();
  let universe: Vec<(String, Vec<PriceBar>)> =
    (0..100).map(|i| (format!("SYM{i}"), generate_bars(500 + i))).collect();

  c.bench_function("scan_parallel_100x500", |b| {
    b.iter(|| {
      let instruments: Vec<(&str, &[PriceBar])> =
        universe.iter().map(|(s, bars)| (s.as_str(), bars.as_slice())).collect();
      scan_parallel(&engine, black_box(instruments))
    })
  });

  c.bench_function("backtest_parallel_100x500", |b| {
    b.iter(|| {
      let instruments: Vec<(&str, &[PriceBar])> =
        universe.iter().map(|(s, bars)| (s.as_str(), bars.as_slice())).collect();
      backtest_parallel(&engine, black_box(instruments))
    })
  });
}

criterion_group!(benches, bench_indicators, bench_classify, bench_backtest, bench_parallel);
criterion_main!(benches);
