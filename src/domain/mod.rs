//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod order;
pub mod position;
pub mod broker;
pub mod risk;
pub mod strategy;
pub mod drawdown;
pub mod ledger;
pub mod metrics;
pub mod backtest;
pub mod config_validation;
pub mod scan;
pub mod universe;
pub mod error;
