//! Closed-trade export as CSV.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestReport;
use crate::domain::error::BacktestError;
use crate::ports::report_port::ReportPort;

const HEADER: [&str; 9] = [
    "symbol",
    "entry_date",
    "exit_date",
    "entry_price",
    "exit_price",
    "size",
    "pnl",
    "pnl_pct",
    "exit_reason",
];

fn csv_error(e: csv::Error) -> BacktestError {
    BacktestError::Io(std::io::Error::other(e.to_string()))
}

#[derive(Debug, Default)]
pub struct CsvTradesAdapter;

impl CsvTradesAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for CsvTradesAdapter {
    fn write(&self, report: &BacktestReport, output_path: &str) -> Result<(), BacktestError> {
        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
        writer.write_record(HEADER).map_err(csv_error)?;
        for t in &report.trades {
            writer
                .write_record([
                    report.symbol.clone(),
                    t.entry_date.to_string(),
                    t.exit_date.to_string(),
                    format!("{:.4}", t.entry_price),
                    format!("{:.4}", t.exit_price),
                    t.size.to_string(),
                    format!("{:.4}", t.pnl),
                    format!("{:.4}", t.pnl_pct),
                    t.exit_reason.to_string(),
                ])
                .map_err(csv_error)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::BacktestConfig;
    use crate::domain::metrics::Metrics;
    use crate::domain::drawdown::DrawdownTracker;
    use crate::domain::position::{ClosedTrade, ExitReason};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn report_with_trades(trades: Vec<ClosedTrade>) -> BacktestReport {
        let cash = BacktestConfig::default().starting_cash;
        BacktestReport {
            symbol: "000001".into(),
            starting_cash: cash,
            final_equity: cash,
            final_cash: cash,
            metrics: Metrics::compute(&[], &trades, cash, &DrawdownTracker::new()),
            drawdown_episodes: Vec::new(),
            open_drawdown: None,
            trades,
            equity_curve: Vec::new(),
            rejected_orders: Vec::new(),
            open_position: None,
        }
    }

    #[test]
    fn writes_header_and_one_row_per_trade() {
        let trade = ClosedTrade {
            entry_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            exit_date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            entry_price: 10.0,
            exit_price: 9.0,
            size: 100,
            pnl: -100.5,
            pnl_pct: -10.05,
            exit_reason: ExitReason::StopLoss,
        };
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");

        CsvTradesAdapter::new()
            .write(&report_with_trades(vec![trade]), path.to_str().unwrap())
            .unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("symbol"));
        assert_eq!(headers.len(), 9);

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), Some("000001"));
        assert_eq!(rows[0].get(1), Some("2024-03-01"));
        assert_eq!(rows[0].get(5), Some("100"));
        assert_eq!(rows[0].get(8), Some("stop-loss"));
    }

    #[test]
    fn empty_trade_list_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/trades.csv");
        CsvTradesAdapter::new()
            .write(&report_with_trades(Vec::new()), path.to_str().unwrap())
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
