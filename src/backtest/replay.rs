//! Bar-by-bar replay state machine.

use super::{BacktestReport, BacktestSummary, ExitReason, OpenTrade, Trade};
use crate::config::{StrategyConfig, StrictnessProfile};
use crate::indicators::IndicatorFrame;
use crate::signal::evaluate_at;
use crate::OHLCV;

#[derive(Debug, Clone, Copy)]
enum ReplayState {
    Flat,
    InTrade(OpenTrade),
}

/// Decide whether `bar` closes a position with the given levels.
///
/// Gaps are checked on the open first. Within the bar, touching both levels resolves
/// to the stop.
pub fn resolve_exit<T: OHLCV>(bar: &T, target: f64, stop: f64) -> Option<(f64, ExitReason)> {
    let open = bar.open();
    if open >= target {
        return Some((open, ExitReason::GapTarget));
    }
    if open <= stop {
        return Some((open, ExitReason::GapStop));
    }

    let hit_target = bar.high() >= target;
    let hit_stop = bar.low() <= stop;
    match (hit_target, hit_stop) {
        (true, true) => Some((stop, ExitReason::BothHitAssumeStop)),
        (true, false) => Some((target, ExitReason::TargetHit)),
        (false, true) => Some((stop, ExitReason::StopHit)),
        (false, false) => None,
    }
}

/// Walk `bars` forward and simulate entries and exits.
///
/// `frame` must have been computed from the same `bars`.
pub fn replay<T: OHLCV>(
    bars: &[T],
    frame: &IndicatorFrame,
    config: &StrategyConfig,
    profile: &StrictnessProfile,
) -> BacktestReport {
    let mut trades = Vec::new();
    let mut state = ReplayState::Flat;

    for i in config.replay_start()..bars.len() {
        match state {
            ReplayState::Flat => {
                let Some(next) = bars.get(i + 1) else {
                    break;
                };
                let signal = evaluate_at(bars, frame, i, config, profile);
                if !signal.state.is_buy() {
                    continue;
                }

                let entry_price = next.open();
                if !(entry_price.is_finite() && entry_price > 0.0) {
                    continue;
                }

                let position = OpenTrade {
                    signal_index: i,
                    entry_index: i + 1,
                    entry_date: next.date(),
                    entry_price,
                    entry_reason: signal.state,
                    target: entry_price * (1.0 + config.target_pct),
                    stop: entry_price * (1.0 - config.stop_pct),
                };
                tracing::debug!(
                    signal_index = i,
                    entry_price,
                    reason = %signal.state,
                    "entering position"
                );
                state = ReplayState::InTrade(position);
            }
            ReplayState::InTrade(pos) => {
                let bar = &bars[i];
                let Some((exit_price, exit_reason)) = resolve_exit(bar, pos.target, pos.stop)
                else {
                    continue;
                };

                let trade = Trade {
                    signal_index: pos.signal_index,
                    entry_index: pos.entry_index,
                    entry_date: pos.entry_date,
                    entry_price: pos.entry_price,
                    entry_reason: pos.entry_reason,
                    exit_index: i,
                    exit_date: bar.date(),
                    exit_price,
                    exit_reason,
                    outcome: exit_reason.outcome(),
                    return_pct: (exit_price - pos.entry_price) / pos.entry_price * 100.0,
                };
                tracing::debug!(
                    exit_index = i,
                    exit_price,
                    reason = %exit_reason,
                    return_pct = trade.return_pct,
                    "closing position"
                );
                trades.push(trade);
                state = ReplayState::Flat;
            }
        }
    }

    let open_trade = match state {
        ReplayState::InTrade(pos) => Some(pos),
        ReplayState::Flat => None,
    };

    BacktestReport {
        summary: BacktestSummary::from_trades(&trades),
        trades,
        open_trade,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PriceBar;

    fn bar(o: f64, h: f64, l: f64, c: f64) -> PriceBar {
        PriceBar::new(None, o, h, l, c, 1000.0)
    }

    #[test]
    fn test_gap_target() {
        let r = resolve_exit(&bar(106.0, 107.0, 105.0, 106.5), 105.0, 98.0);
        assert_eq!(r, Some((106.0, ExitReason::GapTarget)));
    }

    #[test]
    fn test_gap_stop() {
        let r = resolve_exit(&bar(97.0, 99.0, 96.0, 98.5), 105.0, 98.0);
        assert_eq!(r, Some((97.0, ExitReason::GapStop)));
    }

    #[test]
    fn test_both_hit_assumes_stop() {
        let r = resolve_exit(&bar(100.0, 106.0, 97.0, 101.0), 105.0, 98.0);
        assert_eq!(r, Some((98.0, ExitReason::BothHitAssumeStop)));
    }

    #[test]
    fn test_single_level_hits() {
        assert_eq!(
            resolve_exit(&bar(100.0, 105.0, 99.0, 104.0), 105.0, 98.0),
            Some((105.0, ExitReason::TargetHit))
        );
        assert_eq!(
            resolve_exit(&bar(100.0, 101.0, 98.0, 99.0), 105.0, 98.0),
            Some((98.0, ExitReason::StopHit))
        );
        assert_eq!(resolve_exit(&bar(100.0, 104.0, 99.0, 101.0), 105.0, 98.0), None);
    }

    #[test]
    fn test_short_series_has_no_trades() {
        let bars: Vec<PriceBar> = (0..50).map(|_| bar(100.0, 101.0, 99.0, 100.0)).collect();
        let config = StrategyConfig::default();
        let frame = IndicatorFrame::compute(&bars, &config.indicators);
        let report = replay(&bars, &frame, &config, &config.profile());
        assert!(report.is_empty());
        assert!(report.open_trade.is_none());
        assert_eq!(report.summary.win_rate, 0.0);
    }
}
