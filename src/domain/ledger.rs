//! Closed-trade ledger and equity curve.

use chrono::NaiveDate;

use super::position::ClosedTrade;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeLedger {
    trades: Vec<ClosedTrade>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trade: ClosedTrade) {
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn into_trades(self) -> Vec<ClosedTrade> {
        self.trades
    }
}
