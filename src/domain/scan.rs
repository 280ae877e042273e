//! Batch backtests and the golden-cross screener over an instrument universe.
//!
//! Every instrument runs in isolation on the rayon pool. A failure for one
//! instrument is recorded and the batch continues; results keep input order.

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use tracing::{info, warn};

use super::backtest::{run_backtest, BacktestConfig, BacktestReport};
use super::config_validation::validate_config;
use super::error::{BacktestError, ConfigError, DataError};
use super::indicator::{Cross, CrossoverDetector, RollingSma};
use super::ohlcv::PriceSeries;
use super::universe::Instrument;
use crate::ports::data_port::DataPort;

pub const DEFAULT_MIN_BARS: usize = 15;
pub const DEFAULT_SCREEN_LOOKBACK_DAYS: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::invalid(
                "start_date",
                format!("start date {start} is after end date {end}"),
            ));
        }
        Ok(DateRange { start, end })
    }
}

#[derive(Debug)]
pub enum ScanOutcome {
    Completed(BacktestReport),
    Failed { symbol: String, reason: BacktestError },
}

impl ScanOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            ScanOutcome::Completed(report) => &report.symbol,
            ScanOutcome::Failed { symbol, .. } => symbol,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanSummary {
    pub outcomes: Vec<ScanOutcome>,
}

impl ScanSummary {
    pub fn completed(&self) -> impl Iterator<Item = &BacktestReport> {
        self.outcomes.iter().filter_map(|o| match o {
            ScanOutcome::Completed(report) => Some(report),
            ScanOutcome::Failed { .. } => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &BacktestError)> {
        self.outcomes.iter().filter_map(|o| match o {
            ScanOutcome::Failed { symbol, reason } => Some((symbol.as_str(), reason)),
            ScanOutcome::Completed(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Completed reports, best total return first.
    pub fn ranked_by_return(&self) -> Vec<&BacktestReport> {
        let mut reports: Vec<&BacktestReport> = self.completed().collect();
        reports.sort_by(|a, b| b.total_return_pct().total_cmp(&a.total_return_pct()));
        reports
    }
}

fn load_series(
    data_port: &dyn DataPort,
    symbol: &str,
    range: DateRange,
) -> Result<PriceSeries, DataError> {
    let bars = data_port.fetch_bars(symbol, range.start, range.end)?;
    PriceSeries::new(symbol, bars)
}

fn backtest_one(
    data_port: &dyn DataPort,
    instrument: &Instrument,
    range: DateRange,
    config: &BacktestConfig,
) -> ScanOutcome {
    let result = load_series(data_port, &instrument.symbol, range)
        .map_err(BacktestError::from)
        .and_then(|series| run_backtest(&series, config));

    match result {
        Ok(report) => ScanOutcome::Completed(report),
        Err(reason) => {
            warn!(symbol = %instrument.symbol, %reason, "skipping instrument");
            ScanOutcome::Failed {
                symbol: instrument.symbol.clone(),
                reason,
            }
        }
    }
}

/// Backtest every instrument over `range`. Config problems abort the whole
/// batch up front; data problems are reported per instrument.
pub fn scan_universe(
    data_port: &dyn DataPort,
    instruments: &[Instrument],
    range: DateRange,
    config: &BacktestConfig,
) -> Result<ScanSummary, ConfigError> {
    validate_config(config)?;
    info!(instruments = instruments.len(), from = %range.start, to = %range.end, "scanning universe");

    let outcomes: Vec<ScanOutcome> = instruments
        .par_iter()
        .map(|instrument| backtest_one(data_port, instrument, range, config))
        .collect();

    let summary = ScanSummary { outcomes };
    info!(
        completed = summary.completed().count(),
        failed = summary.failed().count(),
        "scan finished"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenParams {
    /// Calendar days of history fetched before `as_of`.
    pub lookback_days: i64,
    pub pfast: usize,
    pub pslow: usize,
    pub min_bars: usize,
}

impl Default for ScreenParams {
    fn default() -> Self {
        ScreenParams {
            lookback_days: DEFAULT_SCREEN_LOOKBACK_DAYS,
            pfast: 5,
            pslow: 10,
            min_bars: DEFAULT_MIN_BARS,
        }
    }
}

impl ScreenParams {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.pfast == 0 {
            return Err(ConfigError::invalid("pfast", "pfast must be at least 1"));
        }
        if self.pfast >= self.pslow {
            return Err(ConfigError::invalid("pfast", "pfast must be less than pslow"));
        }
        if self.lookback_days <= 0 {
            return Err(ConfigError::invalid(
                "lookback_days",
                "lookback_days must be positive",
            ));
        }
        Ok(())
    }
}

/// An instrument whose fast average crossed above the slow one on `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenHit {
    pub instrument: Instrument,
    pub date: NaiveDate,
    pub close: f64,
    pub fast_ma: f64,
    pub slow_ma: f64,
}

fn screen_one(
    data_port: &dyn DataPort,
    instrument: &Instrument,
    as_of: NaiveDate,
    params: &ScreenParams,
) -> Result<Option<ScreenHit>, DataError> {
    let start = as_of - Duration::days(params.lookback_days);
    let bars = data_port.fetch_bars(&instrument.symbol, start, as_of)?;
    if bars.len() < params.min_bars {
        warn!(
            symbol = %instrument.symbol,
            bars = bars.len(),
            minimum = params.min_bars,
            "skipping instrument with too little history"
        );
        return Ok(None);
    }
    let series = PriceSeries::new(instrument.symbol.as_str(), bars)?;

    let mut fast = RollingSma::new(params.pfast);
    let mut slow = RollingSma::new(params.pslow);
    let mut detector = CrossoverDetector::new();
    let mut cross = Cross::None;
    for bar in series.bars() {
        cross = detector.update(fast.push(bar.close), slow.push(bar.close));
    }

    let last = series.last();
    if cross != Cross::Up || last.date != as_of {
        return Ok(None);
    }
    match (fast.value(), slow.value()) {
        (Some(fast_ma), Some(slow_ma)) => Ok(Some(ScreenHit {
            instrument: instrument.clone(),
            date: last.date,
            close: last.close,
            fast_ma,
            slow_ma,
        })),
        _ => Ok(None),
    }
}

/// Instruments whose golden cross fires on the bar dated `as_of`.
pub fn screen_golden_cross(
    data_port: &dyn DataPort,
    instruments: &[Instrument],
    as_of: NaiveDate,
    params: &ScreenParams,
) -> Result<Vec<ScreenHit>, ConfigError> {
    params.validate()?;
    info!(instruments = instruments.len(), %as_of, "screening for golden crosses");

    let hits: Vec<ScreenHit> = instruments
        .par_iter()
        .filter_map(|instrument| match screen_one(data_port, instrument, as_of, params) {
            Ok(hit) => hit,
            Err(reason) => {
                warn!(symbol = %instrument.symbol, %reason, "skipping instrument");
                None
            }
        })
        .collect();

    info!(hits = hits.len(), "screen finished");
    Ok(hits)
}
