//! Report output port.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::BacktestError;

pub trait ReportPort {
    fn write(&self, report: &BacktestReport, output_path: &str) -> Result<(), BacktestError>;
}
