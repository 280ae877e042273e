#![allow(dead_code)]

use chrono::NaiveDate;
use macross::domain::backtest::BacktestConfig;
use macross::domain::error::DataError;
pub use macross::domain::ohlcv::{OhlcvBar, PriceSeries};
use macross::domain::universe::Instrument;
use macross::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub names: HashMap<String, String>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            names: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_name(mut self, symbol: &str, name: &str) -> Self {
        self.names.insert(symbol.to_string(), name.to_string());
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, DataError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(DataError::Fetch {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_instruments(&self) -> Result<Vec<Instrument>, DataError> {
        let mut symbols: Vec<&String> = self.data.keys().chain(self.errors.keys()).collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols
            .into_iter()
            .map(|s| match self.names.get(s) {
                Some(name) => Instrument::new(s.as_str(), name.as_str()),
                None => Instrument::from_symbol(s.as_str()),
            })
            .collect())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One bar per calendar day from 2024-01-01, open = high = low = close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    closes
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
        .collect()
}

pub fn series_from_closes(symbol: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(symbol, bars_from_closes(closes)).unwrap()
}

/// `flat` bars at `base`, then +1 per bar for `up` bars, then -1 per bar for `down` bars.
pub fn rise_and_fall(base: f64, flat: usize, up: usize, down: usize) -> Vec<f64> {
    let mut closes = vec![base; flat];
    let peak = base + up as f64;
    closes.extend((1..=up).map(|i| base + i as f64));
    closes.extend((1..=down).map(|i| peak - i as f64));
    closes
}

/// Defaults with zero commission and the risk overlay off, so signal-driven
/// behaviour can be checked in isolation.
pub fn signal_only_config() -> BacktestConfig {
    BacktestConfig {
        commission_rate: 0.0,
        risk_overlay_enabled: false,
        ..BacktestConfig::default()
    }
}

pub fn all_range() -> macross::domain::scan::DateRange {
    macross::domain::scan::DateRange::new(date(2000, 1, 1), date(2100, 1, 1)).unwrap()
}
