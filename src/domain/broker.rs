//! Virtual broker: cash, commission and the single long position.
//!
//! Fills are same-bar, full, and slippage-free. Cash moves by
//! `size * price +/- size * price * commission_rate`.

use chrono::NaiveDate;
use tracing::debug;

use super::order::{Order, OrderRejection, Side};
use super::position::{ClosedTrade, ExitReason, Position};

/// Fraction of cash the strategy commits on entry.
pub const DEFAULT_POSITION_FRACTION: f64 = 0.95;

/// Result of an accepted order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub side: Side,
    pub size: i64,
    pub price: f64,
    pub commission: f64,
    pub date: NaiveDate,
    /// Set when this fill took the position back to flat.
    pub closed_trade: Option<ClosedTrade>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Broker {
    cash: f64,
    starting_cash: f64,
    commission_rate: f64,
    position: Position,
}

impl Broker {
    pub fn new(starting_cash: f64, commission_rate: f64) -> Self {
        Broker {
            cash: starting_cash,
            starting_cash,
            commission_rate,
            position: Position::flat(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn commission(&self, trade_value: f64) -> f64 {
        trade_value * self.commission_rate
    }

    /// cash + size * close
    pub fn equity(&self, close: f64) -> f64 {
        self.cash + self.position.market_value(close)
    }

    /// Whole shares buyable with `fraction` of cash, capped so the commission
    /// still fits in the remaining cash.
    pub fn size_for_cash(&self, price: f64, fraction: f64) -> i64 {
        if price <= 0.0 || self.cash <= 0.0 {
            return 0;
        }
        let by_fraction = (fraction * self.cash / price).floor();
        let unit_cost = price * (1.0 + self.commission_rate);
        let affordable = (self.cash / unit_cost).floor();
        let mut size = by_fraction.min(affordable) as i64;
        if size > 0 && size as f64 * unit_cost > self.cash {
            size -= 1;
        }
        size.max(0)
    }

    pub fn execute(&mut self, order: &Order, fill_price: f64) -> Result<Fill, OrderRejection> {
        match order.side {
            Side::Buy => self.buy(order, fill_price),
            Side::Sell => self.sell(order, fill_price),
        }
    }

    fn buy(&mut self, order: &Order, price: f64) -> Result<Fill, OrderRejection> {
        let value = order.size as f64 * price;
        let commission = self.commission(value);
        let required = value + commission;

        if order.size <= 0 {
            return Err(OrderRejection::InsufficientFunds {
                required: price * (1.0 + self.commission_rate),
                available: self.cash,
            });
        }
        if required > self.cash {
            return Err(OrderRejection::InsufficientFunds {
                required,
                available: self.cash,
            });
        }

        self.cash -= required;

        let held = self.position.size;
        let new_size = held + order.size;
        let average = match self.position.average_entry_price {
            Some(avg) => (avg * held as f64 + value) / new_size as f64,
            None => price,
        };
        self.position.size = new_size;
        self.position.average_entry_price = Some(average);
        if held == 0 {
            self.position.entry_date = Some(order.requested_on);
        }
        self.position.entry_commission += commission;

        debug!(
            date = %order.requested_on,
            size = order.size,
            price,
            commission,
            cash = self.cash,
            "buy filled"
        );

        Ok(Fill {
            side: Side::Buy,
            size: order.size,
            price,
            commission,
            date: order.requested_on,
            closed_trade: None,
        })
    }

    fn sell(&mut self, order: &Order, price: f64) -> Result<Fill, OrderRejection> {
        let held = self.position.size;
        if order.size <= 0 || order.size > held {
            return Err(OrderRejection::OverSell {
                requested: order.size,
                held,
            });
        }

        let value = order.size as f64 * price;
        let commission = self.commission(value);
        self.cash += value - commission;

        let remaining = held - order.size;
        let closed_trade = if remaining == 0 {
            let entry_price = self.position.average_entry_price.unwrap_or(price);
            let entry_date = self.position.entry_date.unwrap_or(order.requested_on);
            let round_trip_commission = self.position.entry_commission + commission;
            let pnl = (price - entry_price) * order.size as f64 - round_trip_commission;
            let cost_basis = entry_price * order.size as f64;
            let pnl_pct = if cost_basis > 0.0 {
                pnl / cost_basis * 100.0
            } else {
                0.0
            };

            self.position = Position::flat();

            Some(ClosedTrade {
                entry_date,
                exit_date: order.requested_on,
                entry_price,
                exit_price: price,
                size: order.size,
                pnl,
                pnl_pct,
                exit_reason: order.exit_reason.unwrap_or(ExitReason::Signal),
            })
        } else {
            // Average entry price is unchanged on a partial sell; the accrued entry
            // commission shrinks with the shares still held.
            self.position.entry_commission *= remaining as f64 / held as f64;
            self.position.size = remaining;
            None
        };

        debug!(
            date = %order.requested_on,
            size = order.size,
            price,
            commission,
            cash = self.cash,
            "sell filled"
        );

        Ok(Fill {
            side: Side::Sell,
            size: order.size,
            price,
            commission,
            date: order.requested_on,
            closed_trade,
        })
    }
}
