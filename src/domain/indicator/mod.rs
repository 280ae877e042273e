//! Technical indicators.
//!
//! - `IndicatorPoint` / `IndicatorSeries`: whole-series output for inspection
//! - `IndicatorEngine`: the incremental, causal per-bar engine the backtest uses
//! - `IndicatorSnapshot`: what the engine knows after a given bar

pub mod breadth;
pub mod crossover;
pub mod slope;
pub mod sma;

use chrono::NaiveDate;
use std::fmt;

use crate::domain::ohlcv::OhlcvBar;

pub use breadth::BreadthWindow;
pub use crossover::{Cross, CrossoverDetector};
pub use slope::Slope;
pub use sma::RollingSma;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
}

impl IndicatorValue {
    pub fn simple(&self) -> Option<f64> {
        match self {
            IndicatorValue::Simple(v) => Some(*v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
        }
    }
}

/// Periods the engine is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorParams {
    pub pfast: usize,
    pub pslow: usize,
    pub slope_period: usize,
    pub lookback_period: usize,
}

/// Indicator state after bar `index`. Absent values are `None`, never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub index: usize,
    pub date: NaiveDate,
    pub fast_ma: Option<f64>,
    pub slow_ma: Option<f64>,
    pub crossover: Cross,
    pub slope: Option<f64>,
    pub percentile_rank: Option<usize>,
}

impl IndicatorSnapshot {
    /// Both averages are defined.
    pub fn has_averages(&self) -> bool {
        self.fast_ma.is_some() && self.slow_ma.is_some()
    }
}

/// Causal per-bar engine: feeding bar i only uses bars 0..=i.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    fast: RollingSma,
    slow: RollingSma,
    crossover: CrossoverDetector,
    slope: Slope,
    breadth: BreadthWindow,
    bars_seen: usize,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        IndicatorEngine {
            fast: RollingSma::new(params.pfast),
            slow: RollingSma::new(params.pslow),
            crossover: CrossoverDetector::new(),
            slope: Slope::new(params.slope_period),
            breadth: BreadthWindow::new(params.lookback_period),
            bars_seen: 0,
        }
    }

    pub fn update(&mut self, bar: &OhlcvBar) -> IndicatorSnapshot {
        let fast_ma = self.fast.push(bar.close);
        let slow_ma = self.slow.push(bar.close);
        let crossover = self.crossover.update(fast_ma, slow_ma);
        let slope = self.slope.push(fast_ma);
        let percentile_rank = self.breadth.push(bar.open, bar.close);

        let index = self.bars_seen;
        self.bars_seen += 1;

        IndicatorSnapshot {
            index,
            date: bar.date,
            fast_ma,
            slow_ma,
            crossover,
            slope,
            percentile_rank,
        }
    }
}

/// Run the engine over a whole slice, one snapshot per bar.
pub fn compute_snapshots(bars: &[OhlcvBar], params: IndicatorParams) -> Vec<IndicatorSnapshot> {
    let mut engine = IndicatorEngine::new(params);
    bars.iter().map(|bar| engine.update(bar)).collect()
}
