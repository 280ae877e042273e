//! OHLCV bars and the validated price series a run consumes.

use chrono::NaiveDate;

use super::error::DataError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    fn check(&self) -> Result<(), DataError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(DataError::InvalidBar {
                date: self.date,
                reason: "prices must be finite and positive".into(),
            });
        }
        if self.high < self.low {
            return Err(DataError::InvalidBar {
                date: self.date,
                reason: format!("high {} below low {}", self.high, self.low),
            });
        }
        if self.volume < 0 {
            return Err(DataError::InvalidBar {
                date: self.date,
                reason: "volume must be non-negative".into(),
            });
        }
        Ok(())
    }
}

/// Bars for one instrument, dates strictly increasing.
///
/// The only way to build one is [`PriceSeries::new`], so every series in the
/// engine has already passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, DataError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(DataError::Empty { symbol });
        }

        for (index, bar) in bars.iter().enumerate() {
            bar.check()?;
            if index > 0 {
                let previous = bars[index - 1].date;
                if bar.date <= previous {
                    return Err(DataError::OutOfOrder {
                        index,
                        previous,
                        date: bar.date,
                    });
                }
            }
        }

        Ok(PriceSeries { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    pub fn last(&self) -> &OhlcvBar {
        &self.bars[self.bars.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 50_000,
        }
    }

    #[test]
    fn series_accepts_increasing_dates_with_gaps() {
        let series = PriceSeries::new("002031", vec![bar(2, 10.0), bar(3, 11.0), bar(8, 12.0)])
            .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.symbol(), "002031");
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert!((series.last().close - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn series_rejects_empty() {
        let err = PriceSeries::new("X", vec![]).unwrap_err();
        assert!(matches!(err, DataError::Empty { symbol } if symbol == "X"));
    }

    #[test]
    fn series_rejects_duplicate_date() {
        let err = PriceSeries::new("X", vec![bar(2, 10.0), bar(2, 11.0)]).unwrap_err();
        assert!(matches!(err, DataError::OutOfOrder { index: 1, .. }));
    }

    #[test]
    fn series_rejects_out_of_order() {
        let err = PriceSeries::new("X", vec![bar(5, 10.0), bar(6, 11.0), bar(4, 9.0)])
            .unwrap_err();
        assert!(matches!(err, DataError::OutOfOrder { index: 2, .. }));
    }

    #[test]
    fn series_rejects_non_positive_price() {
        let err = PriceSeries::new("X", vec![bar(2, 10.0), bar(3, 0.0)]).unwrap_err();
        assert!(matches!(err, DataError::InvalidBar { .. }));
    }

    #[test]
    fn series_rejects_nan_price() {
        let err = PriceSeries::new("X", vec![bar(2, f64::NAN)]).unwrap_err();
        assert!(matches!(err, DataError::InvalidBar { .. }));
    }

    #[test]
    fn series_rejects_inverted_range() {
        let mut b = bar(2, 10.0);
        b.high = 8.0;
        let err = PriceSeries::new("X", vec![b]).unwrap_err();
        assert!(matches!(err, DataError::InvalidBar { .. }));
    }
}
