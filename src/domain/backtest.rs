//! Backtest engine and event loop.
//!
//! Per bar, strictly in date order: indicators -> risk overlay -> strategy ->
//! broker -> drawdown -> ledger. A run is a pure function of
//! (`PriceSeries`, `BacktestConfig`).

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::broker::{Broker, DEFAULT_POSITION_FRACTION};
use super::config_validation::validate_config;
use super::drawdown::{DrawdownEpisode, DrawdownTracker, OpenDrawdown};
use super::error::BacktestError;
use super::indicator::{IndicatorEngine, IndicatorParams};
use super::ledger::{EquityPoint, TradeLedger};
use super::metrics::Metrics;
use super::ohlcv::{OhlcvBar, PriceSeries};
use super::order::{Order, OrderRejection};
use super::position::{ClosedTrade, ExitReason, Position};
use super::risk::{RiskOverlay, RiskParams};
use super::strategy::{BreadthFilter, Decision, MaCrossStrategy};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub starting_cash: f64,
    pub commission_rate: f64,
    pub pfast: usize,
    pub pslow: usize,
    pub slope_period: usize,
    pub lookback_period: usize,
    pub stop_loss_pct: f64,
    pub trail_stop_pct: f64,
    pub risk_overlay_enabled: bool,
    pub breadth_filter_enabled: bool,
    pub breadth_max_lower_days: usize,
    pub position_fraction: f64,
    pub liquidate_at_end: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            starting_cash: 50_000.0,
            commission_rate: 0.0005,
            pfast: 5,
            pslow: 10,
            slope_period: 3,
            lookback_period: 63,
            stop_loss_pct: 0.10,
            trail_stop_pct: 0.05,
            risk_overlay_enabled: true,
            breadth_filter_enabled: false,
            breadth_max_lower_days: 63,
            position_fraction: DEFAULT_POSITION_FRACTION,
            liquidate_at_end: false,
        }
    }
}

impl BacktestConfig {
    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            pfast: self.pfast,
            pslow: self.pslow,
            slope_period: self.slope_period,
            lookback_period: self.lookback_period,
        }
    }

    pub fn risk_params(&self) -> RiskParams {
        RiskParams {
            enabled: self.risk_overlay_enabled,
            stop_loss_pct: self.stop_loss_pct,
            trail_stop_pct: self.trail_stop_pct,
        }
    }

    pub fn breadth_filter(&self) -> BreadthFilter {
        BreadthFilter {
            enabled: self.breadth_filter_enabled,
            max_lower_days: self.breadth_max_lower_days,
        }
    }
}

/// An order the broker refused, kept for the report.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOrder {
    pub date: NaiveDate,
    pub order: Order,
    pub reason: OrderRejection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub symbol: String,
    pub starting_cash: f64,
    pub final_equity: f64,
    pub final_cash: f64,
    pub metrics: Metrics,
    pub drawdown_episodes: Vec<DrawdownEpisode>,
    pub open_drawdown: Option<OpenDrawdown>,
    pub trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub rejected_orders: Vec<RejectedOrder>,
    /// Still-open position at the end, if not liquidated.
    pub open_position: Option<Position>,
}

impl BacktestReport {
    pub fn total_return_pct(&self) -> f64 {
        self.metrics.total_return_pct
    }

    pub fn max_drawdown_pct(&self) -> f64 {
        self.metrics.max_drawdown_pct
    }
}

/// Per-run mutable state; nothing here outlives a single call.
struct Run {
    engine: IndicatorEngine,
    risk: RiskOverlay,
    strategy: MaCrossStrategy,
    broker: Broker,
    drawdown: DrawdownTracker,
    ledger: TradeLedger,
    equity_curve: Vec<EquityPoint>,
    rejected: Vec<RejectedOrder>,
    position_fraction: f64,
    liquidate_at_end: bool,
}

impl Run {
    fn new(config: &BacktestConfig, bars: usize) -> Self {
        Run {
            engine: IndicatorEngine::new(config.indicator_params()),
            risk: RiskOverlay::new(config.risk_params()),
            strategy: MaCrossStrategy::new(config.breadth_filter()),
            broker: Broker::new(config.starting_cash, config.commission_rate),
            drawdown: DrawdownTracker::new(),
            ledger: TradeLedger::new(),
            equity_curve: Vec::with_capacity(bars),
            rejected: Vec::new(),
            position_fraction: config.position_fraction,
            liquidate_at_end: config.liquidate_at_end,
        }
    }

    fn submit(&mut self, order: Order, price: f64) {
        match self.broker.execute(&order, price) {
            Ok(fill) => {
                if let Some(trade) = fill.closed_trade {
                    debug!(
                        exit_date = %trade.exit_date,
                        pnl = trade.pnl,
                        reason = %trade.exit_reason,
                        "trade closed"
                    );
                    self.risk.on_exit();
                    self.strategy.on_exit_filled();
                    self.ledger.record(trade);
                } else {
                    self.risk.on_entry(fill.price);
                    self.strategy.on_entry_filled();
                }
            }
            Err(reason) => {
                warn!(date = %order.requested_on, side = %order.side, %reason, "order rejected");
                self.rejected.push(RejectedOrder {
                    date: order.requested_on,
                    order,
                    reason,
                });
            }
        }
    }

    /// One bar: indicators, risk, strategy, fills, then a single equity mark.
    /// On the last bar any remaining position is sold before the mark when
    /// `liquidate_at_end` is set.
    fn step(&mut self, bar: &OhlcvBar, last: bool) {
        let snapshot = self.engine.update(bar);

        let risk_exit = match self.broker.position().average_entry_price {
            Some(entry) if self.broker.position().is_long() => {
                self.risk.evaluate(entry, bar.close)
            }
            _ => None,
        };

        match self.strategy.decide(&snapshot, risk_exit) {
            Decision::Hold => {}
            Decision::Enter => {
                debug!(date = %bar.date, close = bar.close, "golden cross");
                let size = self.broker.size_for_cash(bar.close, self.position_fraction);
                self.submit(Order::buy(size, bar.date), bar.close);
            }
            Decision::Exit(reason) => {
                debug!(date = %bar.date, close = bar.close, %reason, "exit signal");
                let size = self.broker.position().size;
                self.submit(Order::exit(size, bar.date, reason), bar.close);
            }
        }

        if last && self.liquidate_at_end {
            self.liquidate(bar.date, bar.close);
        }

        let equity = self.broker.equity(bar.close);
        self.drawdown.update(bar.date, equity);
        self.equity_curve.push(EquityPoint {
            date: bar.date,
            equity,
        });
    }

    fn liquidate(&mut self, date: NaiveDate, close: f64) {
        let size = self.broker.position().size;
        if size > 0 {
            self.submit(Order::exit(size, date, ExitReason::EndOfData), close);
        }
    }
}

/// Run one backtest. Config and data problems are returned before any bar is
/// processed; broker rejections are recorded in the report.
pub fn run_backtest(
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestReport, BacktestError> {
    validate_config(config)?;

    info!(
        symbol = series.symbol(),
        bars = series.len(),
        from = %series.first_date(),
        to = %series.last_date(),
        "running backtest"
    );

    let mut run = Run::new(config, series.len());
    let last_index = series.len() - 1;
    for (i, bar) in series.bars().iter().enumerate() {
        run.step(bar, i == last_index);
    }

    let metrics = Metrics::compute(
        &run.equity_curve,
        run.ledger.trades(),
        config.starting_cash,
        &run.drawdown,
    );

    let open_position = {
        let pos = run.broker.position();
        (!pos.is_flat()).then(|| pos.clone())
    };

    info!(
        symbol = series.symbol(),
        trades = metrics.total_trades,
        realized_pnl = run.ledger.total_pnl(),
        final_equity = metrics.final_equity,
        return_pct = metrics.total_return_pct,
        "backtest finished"
    );

    Ok(BacktestReport {
        symbol: series.symbol().to_string(),
        starting_cash: config.starting_cash,
        final_equity: metrics.final_equity,
        final_cash: run.broker.cash(),
        drawdown_episodes: run.drawdown.episodes().to_vec(),
        open_drawdown: run.drawdown.open_episode(),
        metrics,
        trades: run.ledger.into_trades(),
        equity_curve: run.equity_curve,
        rejected_orders: run.rejected,
        open_position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ConfigError;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    fn config() -> BacktestConfig {
        BacktestConfig {
            starting_cash: 10_000.0,
            commission_rate: 0.0,
            pfast: 2,
            pslow: 3,
            slope_period: 1,
            lookback_period: 3,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn default_config_matches_documented_values() {
        let c = BacktestConfig::default();
        assert!((c.starting_cash - 50_000.0).abs() < f64::EPSILON);
        assert!((c.commission_rate - 0.0005).abs() < f64::EPSILON);
        assert_eq!((c.pfast, c.pslow, c.slope_period, c.lookback_period), (5, 10, 3, 63));
        assert!((c.stop_loss_pct - 0.10).abs() < f64::EPSILON);
        assert!((c.trail_stop_pct - 0.05).abs() < f64::EPSILON);
        assert!(!c.breadth_filter_enabled);
        assert!(!c.liquidate_at_end);
    }

    #[test]
    fn invalid_config_fails_before_run() {
        let bad = BacktestConfig {
            pfast: 10,
            pslow: 5,
            ..config()
        };
        let err = run_backtest(&series(&[10.0; 5]), &bad).unwrap_err();
        assert!(matches!(err, BacktestError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn one_equity_point_per_bar() {
        let report = run_backtest(&series(&[10.0, 11.0, 12.0, 11.0]), &config()).unwrap();
        assert_eq!(report.equity_curve.len(), 4);
        assert_eq!(report.metrics.bars, 4);
    }

    #[test]
    fn cross_up_then_down_round_trip() {
        let closes = [10.0, 10.0, 10.0, 12.0, 14.0, 13.0, 9.0, 8.0];
        let report = run_backtest(&series(&closes), &config()).unwrap();

        assert_eq!(report.trades.len(), 1);
        let trade = &report.trades[0];
        assert!((trade.entry_price - 12.0).abs() < f64::EPSILON);
        assert_eq!(trade.entry_date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert!(report.open_position.is_none());
    }

    #[test]
    fn open_position_left_open_without_liquidation() {
        let closes = [10.0, 10.0, 10.0, 12.0, 13.0, 14.0];
        let report = run_backtest(&series(&closes), &config()).unwrap();

        assert!(report.trades.is_empty());
        let pos = report.open_position.as_ref().unwrap();
        assert!(pos.size > 0);
        let expected = report.final_cash + pos.size as f64 * 14.0;
        assert!((report.final_equity - expected).abs() < 1e-9);
    }

    #[test]
    fn liquidation_closes_at_last_bar() {
        let closes = [10.0, 10.0, 10.0, 12.0, 13.0, 14.0];
        let cfg = BacktestConfig {
            liquidate_at_end: true,
            ..config()
        };
        let report = run_backtest(&series(&closes), &cfg).unwrap();

        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].exit_reason, ExitReason::EndOfData);
        assert!((report.trades[0].exit_price - 14.0).abs() < f64::EPSILON);
        assert!(report.open_position.is_none());
        assert!((report.final_equity - report.final_cash).abs() < 1e-9);
    }

    #[test]
    fn liquidation_drawdown_matches_equity_curve() {
        let closes = [10.0, 10.0, 10.0, 12.0, 13.0, 14.0];
        let cfg = BacktestConfig {
            commission_rate: 0.01,
            liquidate_at_end: true,
            ..config()
        };
        let report = run_backtest(&series(&closes), &cfg).unwrap();

        let mut peak = f64::MIN;
        let mut max_dd = 0.0_f64;
        for point in &report.equity_curve {
            peak = peak.max(point.equity);
            max_dd = max_dd.max((peak - point.equity) / peak * 100.0);
        }
        let last = report.equity_curve.last().unwrap().equity;

        assert_eq!(report.equity_curve.len(), closes.len());
        assert!((last - report.final_equity).abs() < 1e-9);
        assert!((report.max_drawdown_pct() - max_dd).abs() < 1e-9);
        assert!((last - peak).abs() < 1e-9);
        assert!(report.open_drawdown.is_none());
    }

    #[test]
    fn rejected_entry_stays_flat() {
        let cfg = BacktestConfig {
            starting_cash: 5.0,
            ..config()
        };
        let report = run_backtest(&series(&[10.0, 10.0, 10.0, 12.0, 13.0]), &cfg).unwrap();

        assert_eq!(report.rejected_orders.len(), 1);
        assert!(matches!(
            report.rejected_orders[0].reason,
            OrderRejection::InsufficientFunds { .. }
        ));
        assert!(report.trades.is_empty());
        assert!(report.open_position.is_none());
        assert!((report.final_equity - 5.0).abs() < f64::EPSILON);
    }
}
