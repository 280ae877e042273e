//! Position tracking and closed trades.

use chrono::NaiveDate;
use std::fmt;

/// Long-only holding. Entry fields are `None` exactly when flat.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Position {
    pub size: i64,
    pub average_entry_price: Option<f64>,
    pub entry_date: Option<NaiveDate>,
    /// Commission paid by the buys of the open round trip.
    pub entry_commission: f64,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.size == 0
    }

    pub fn is_long(&self) -> bool {
        self.size > 0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.size as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.average_entry_price {
            Some(entry) => self.size as f64 * (price - entry),
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TrailingStop,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::StopLoss => write!(f, "stop-loss"),
            ExitReason::TrailingStop => write!(f, "trailing-stop"),
            ExitReason::EndOfData => write!(f, "end-of-data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: i64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_position() -> Position {
        Position {
            size: 100,
            average_entry_price: Some(50.0),
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            entry_commission: 2.5,
        }
    }

    #[test]
    fn flat_position_has_no_entry() {
        let pos = Position::flat();
        assert!(pos.is_flat());
        assert!(!pos.is_long());
        assert_eq!(pos.average_entry_price, None);
        assert_eq!(pos.entry_date, None);
        assert!((pos.unrealized_pnl(99.0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn market_value_long() {
        let pos = long_position();
        assert!((pos.market_value(55.0) - 5500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_profit_and_loss() {
        let pos = long_position();
        assert!((pos.unrealized_pnl(55.0) - 500.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(45.0) - (-500.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn closed_trade_holding_days() {
        let trade = ClosedTrade {
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            exit_date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            entry_price: 50.0,
            exit_price: 55.0,
            size: 100,
            pnl: 485.0,
            pnl_pct: 9.7,
            exit_reason: ExitReason::Signal,
        };
        assert_eq!(trade.holding_days(), 5);
        assert!(trade.is_win());
    }

    #[test]
    fn exit_reason_display() {
        assert_eq!(ExitReason::StopLoss.to_string(), "stop-loss");
        assert_eq!(ExitReason::TrailingStop.to_string(), "trailing-stop");
    }
}
