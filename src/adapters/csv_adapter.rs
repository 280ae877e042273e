//! CSV file data adapter.
//!
//! Layout under the base directory:
//! - `<SYMBOL>.csv`: `date,open,high,low,close,volume`
//! - `universe.csv`: `symbol,name` (optional)

use crate::domain::error::DataError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::Instrument;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub const UNIVERSE_FILE: &str = "universe.csv";

/// Accepts `2024-01-15` and `20240115`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

fn field<'a>(record: &'a csv::StringRecord, index: usize, name: &str) -> Result<&'a str, DataError> {
    record.get(index).map(str::trim).ok_or_else(|| DataError::Parse {
        reason: format!("missing {name} column"),
    })
}

fn number<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<T, DataError>
where
    T::Err: std::fmt::Display,
{
    let raw = field(record, index, name)?;
    raw.parse().map_err(|e| DataError::Parse {
        reason: format!("invalid {name} value {raw:?}: {e}"),
    })
}

/// Volumes are sometimes written as floats (`123456.0`).
fn volume(record: &csv::StringRecord) -> Result<i64, DataError> {
    let raw = field(record, 5, "volume")?;
    raw.parse::<i64>()
        .or_else(|_| raw.parse::<f64>().map(|v| v.round() as i64))
        .map_err(|e| DataError::Parse {
            reason: format!("invalid volume value {raw:?}: {e}"),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, DataError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| DataError::Fetch {
            symbol: symbol.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| DataError::Parse {
                reason: format!("{symbol}: {e}"),
            })?;

            let raw_date = field(&record, 0, "date")?;
            let date = parse_date(raw_date).ok_or_else(|| DataError::Parse {
                reason: format!("{symbol}: invalid date {raw_date:?}"),
            })?;

            if date < start || date > end {
                continue;
            }

            bars.push(OhlcvBar {
                date,
                open: number(&record, 1, "open")?,
                high: number(&record, 2, "high")?,
                low: number(&record, 3, "low")?,
                close: number(&record, 4, "close")?,
                volume: volume(&record)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    /// `universe.csv` when present, otherwise every `<SYMBOL>.csv` in the
    /// directory with the symbol doubling as the name.
    fn list_instruments(&self) -> Result<Vec<Instrument>, DataError> {
        let universe = self.base_path.join(UNIVERSE_FILE);
        if universe.exists() {
            let mut rdr = csv::Reader::from_path(&universe).map_err(|e| DataError::Parse {
                reason: format!("{}: {}", universe.display(), e),
            })?;
            let mut instruments = Vec::new();
            for result in rdr.records() {
                let record = result.map_err(|e| DataError::Parse {
                    reason: format!("{}: {}", universe.display(), e),
                })?;
                let symbol = field(&record, 0, "symbol")?;
                let name = record.get(1).map(str::trim).unwrap_or(symbol);
                instruments.push(Instrument::new(symbol, name));
            }
            return Ok(instruments);
        }

        let entries = fs::read_dir(&self.base_path).map_err(|e| DataError::Fetch {
            symbol: "*".to_string(),
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Fetch {
                symbol: "*".to_string(),
                reason: format!("directory entry error: {e}"),
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(".csv") {
                instruments.push(Instrument::from_symbol(symbol));
            }
        }

        instruments.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(instruments)
    }
}
