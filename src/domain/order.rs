//! Orders and broker rejections.
//!
//! An order lives for one bar: it is created by the strategy and either filled at
//! that bar's close or rejected.

use chrono::NaiveDate;
use std::fmt;

use super::position::ExitReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub side: Side,
    pub size: i64,
    pub requested_on: NaiveDate,
    /// Recorded on the closed trade when this sell flattens the position.
    pub exit_reason: Option<ExitReason>,
}

impl Order {
    pub fn buy(size: i64, requested_on: NaiveDate) -> Self {
        Order {
            side: Side::Buy,
            size,
            requested_on,
            exit_reason: None,
        }
    }

    pub fn sell(size: i64, requested_on: NaiveDate) -> Self {
        Order {
            side: Side::Sell,
            size,
            requested_on,
            exit_reason: None,
        }
    }

    /// Sell `size` because of `reason`.
    pub fn exit(size: i64, requested_on: NaiveDate, reason: ExitReason) -> Self {
        Order {
            exit_reason: Some(reason),
            ..Order::sell(size, requested_on)
        }
    }
}

/// Why the broker refused an order. Recoverable: the run continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderRejection {
    #[error("insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("oversell: requested {requested}, holding {held}")]
    OverSell { requested: i64, held: i64 },
}
