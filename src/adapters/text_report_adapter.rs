//! Plain-text report adapter: metrics summary, monthly returns, trade log.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::Datelike;

use crate::domain::backtest::BacktestReport;
use crate::domain::error::BacktestError;
use crate::domain::ledger::EquityPoint;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub return_pct: f64,
}

/// Month-end over previous month-end equity. The first month is measured
/// against its own first point.
pub fn compute_monthly_returns(equity_curve: &[EquityPoint]) -> Vec<MonthlyReturn> {
    let mut months: BTreeMap<(i32, u32), (f64, f64)> = BTreeMap::new();
    for point in equity_curve {
        let entry = months
            .entry((point.date.year(), point.date.month()))
            .or_insert((point.equity, point.equity));
        entry.1 = point.equity;
    }

    let mut previous_end: Option<f64> = None;
    months
        .into_iter()
        .map(|((year, month), (first, last))| {
            let base = previous_end.unwrap_or(first);
            previous_end = Some(last);
            let return_pct = if base > 0.0 {
                (last - base) / base * 100.0
            } else {
                0.0
            };
            MonthlyReturn {
                year,
                month,
                return_pct,
            }
        })
        .collect()
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "n/a".to_string(),
    }
}

pub fn render_text(report: &BacktestReport) -> String {
    let m = &report.metrics;
    let mut out = String::new();

    let _ = writeln!(out, "Backtest report: {}", report.symbol);
    if let (Some(first), Some(last)) = (report.equity_curve.first(), report.equity_curve.last()) {
        let _ = writeln!(out, "Period:            {} to {} ({} bars)", first.date, last.date, m.bars);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Starting cash:     {:.2}", report.starting_cash);
    let _ = writeln!(out, "Final equity:      {:.2}", report.final_equity);
    let _ = writeln!(out, "Final cash:        {:.2}", report.final_cash);
    let _ = writeln!(out, "Total return:      {:.2}%", m.total_return_pct);
    let _ = writeln!(out, "Sharpe (per bar):  {}", opt(m.sharpe, 4));
    let _ = writeln!(out, "Sharpe (annual):   {}", opt(m.sharpe_annualized, 4));
    let _ = writeln!(out, "SQN:               {}", opt(m.sqn, 4));
    let _ = writeln!(out, "Max drawdown:      {:.2}%", m.max_drawdown_pct);
    let _ = writeln!(out, "Max DD duration:   {} days", m.max_drawdown_duration_days);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Trades:            {} (won {}, lost {})",
        m.total_trades, m.trades_won, m.trades_lost
    );
    let _ = writeln!(out, "Win rate:          {}", opt(m.win_rate.map(|w| w * 100.0), 2));
    let _ = writeln!(out, "Average win:       {}", opt(m.avg_win, 2));
    let _ = writeln!(out, "Average loss:      {}", opt(m.avg_loss, 2));
    let _ = writeln!(out, "Profit ratio:      {}", opt(m.profit_ratio, 4));
    let _ = writeln!(out, "Largest win:       {}", opt(m.largest_win, 2));
    let _ = writeln!(out, "Largest loss:      {}", opt(m.largest_loss, 2));
    let _ = writeln!(out, "Avg holding days:  {}", opt(m.avg_holding_days, 1));

    if let Some(pos) = &report.open_position {
        let _ = writeln!(
            out,
            "Open position:     {} shares @ {}",
            pos.size,
            opt(pos.average_entry_price, 2)
        );
        if let Some(last) = report.equity_curve.last() {
            let close = (last.equity - report.final_cash) / pos.size as f64;
            let _ = writeln!(out, "Unrealized P&L:    {:.2}", pos.unrealized_pnl(close));
        }
    }
    if !report.rejected_orders.is_empty() {
        let _ = writeln!(out, "Rejected orders:   {}", report.rejected_orders.len());
    }

    if !report.drawdown_episodes.is_empty() || report.open_drawdown.is_some() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Drawdowns:");
        for ep in &report.drawdown_episodes {
            let _ = writeln!(
                out,
                "  {} -> {}  {:>6.2}%  {} days",
                ep.start_date, ep.end_date, ep.magnitude_pct, ep.duration_days
            );
        }
        if let Some(open) = &report.open_drawdown {
            let _ = writeln!(
                out,
                "  {} -> open        {:>6.2}%  {} days",
                open.start_date, open.magnitude_pct, open.duration_days
            );
        }
    }

    let monthly = compute_monthly_returns(&report.equity_curve);
    if !monthly.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Monthly returns:");
        for r in &monthly {
            let _ = writeln!(out, "  {}-{:02}  {:>7.2}%", r.year, r.month, r.return_pct);
        }
    }

    if !report.trades.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Trades:");
        let _ = writeln!(
            out,
            "  {:<10}  {:<10}  {:>10}  {:>10}  {:>8}  {:>12}  {:>8}  {}",
            "entry", "exit", "entry px", "exit px", "size", "pnl", "pnl %", "reason"
        );
        for t in &report.trades {
            let _ = writeln!(
                out,
                "  {:<10}  {:<10}  {:>10.2}  {:>10.2}  {:>8}  {:>12.2}  {:>8.2}  {}",
                t.entry_date,
                t.exit_date,
                t.entry_price,
                t.exit_price,
                t.size,
                t.pnl,
                t.pnl_pct,
                t.exit_reason
            );
        }
    }

    out
}

#[derive(Debug, Default)]
pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for TextReportAdapter {
    fn write(&self, report: &BacktestReport, output_path: &str) -> Result<(), BacktestError> {
        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, render_text(report))?;
        Ok(())
    }
}
