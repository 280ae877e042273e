//! Market data access port.

use crate::domain::error::DataError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::Instrument;
use chrono::NaiveDate;

/// Source of daily bars. `Sync` so batch scans can share one instance across
/// worker threads.
pub trait DataPort: Sync {
    /// Bars for `symbol` dated within `[start, end]`, oldest first.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, DataError>;

    fn list_instruments(&self) -> Result<Vec<Instrument>, DataError>;
}
