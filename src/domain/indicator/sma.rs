//! Simple Moving Average.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) bars are invalid.

use std::collections::VecDeque;

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

/// Incremental SMA over a running sum; one push per bar.
#[derive(Debug, Clone)]
pub struct RollingSma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl RollingSma {
    pub fn new(period: usize) -> Self {
        RollingSma {
            period,
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Feed the next close; returns the average once `period` closes have been seen.
    pub fn push(&mut self, close: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        self.window.push_back(close);
        self.sum += close;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.period > 0 && self.window.len() == self.period {
            Some(self.sum / self.period as f64)
        } else {
            None
        }
    }
}

/// Whole-series SMA computed window by window.
pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values: Vec::new(),
        };
    }

    let warmup = period - 1;
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = i >= warmup;
            let value = if valid {
                let window = &bars[i + 1 - period..=i];
                window.iter().map(|b| b.close).sum::<f64>() / period as f64
            } else {
                0.0
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value: IndicatorValue::Simple(value),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
