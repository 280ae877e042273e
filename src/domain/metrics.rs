//! Performance statistics computed once at the end of a run.
//!
//! Ratios are `Option<f64>`: `None` means undefined (no trades, zero variance,
//! too few samples), never NaN.

use super::drawdown::DrawdownTracker;
use super::ledger::EquityPoint;
use super::position::ClosedTrade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_equity: f64,
    pub total_return_pct: f64,
    pub sharpe: Option<f64>,
    pub sharpe_annualized: Option<f64>,
    pub sqn: Option<f64>,
    pub max_drawdown_pct: f64,
    pub max_drawdown_duration_days: i64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: Option<f64>,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub profit_ratio: Option<f64>,
    pub largest_win: Option<f64>,
    pub largest_loss: Option<f64>,
    pub avg_holding_days: Option<f64>,
    pub bars: usize,
}

impl Metrics {
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[ClosedTrade],
        starting_cash: f64,
        drawdown: &DrawdownTracker,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(starting_cash);

        let total_return_pct = if starting_cash > 0.0 {
            (final_equity - starting_cash) / starting_cash * 100.0
        } else {
            0.0
        };

        let sharpe = compute_sharpe(equity_curve);
        let sharpe_annualized = sharpe.map(|s| s * TRADING_DAYS_PER_YEAR.sqrt());

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win: Option<f64> = None;
        let mut largest_loss: Option<f64> = None;
        let mut total_holding_days = 0i64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = Some(largest_win.map_or(pnl, |w| w.max(pnl)));
            } else {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = Some(largest_loss.map_or(pnl.abs(), |l| l.max(pnl.abs())));
            }
            total_holding_days += trade.holding_days();
        }

        let total_trades = trades.len();
        let win_rate = (total_trades > 0).then(|| trades_won as f64 / total_trades as f64);
        let avg_win = (trades_won > 0).then(|| total_wins / trades_won as f64);
        let avg_loss = (trades_lost > 0).then(|| total_losses / trades_lost as f64);

        let profit_ratio = if total_trades == 0 {
            None
        } else {
            match avg_loss {
                Some(loss) if loss > 0.0 => Some(avg_win.unwrap_or(0.0) / loss),
                _ => Some(0.0),
            }
        };

        let avg_holding_days =
            (total_trades > 0).then(|| total_holding_days as f64 / total_trades as f64);

        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();

        Metrics {
            final_equity,
            total_return_pct,
            sharpe,
            sharpe_annualized,
            sqn: compute_sqn(&pnls),
            max_drawdown_pct: drawdown.max_drawdown_pct(),
            max_drawdown_duration_days: drawdown.max_duration_days(),
            total_trades,
            trades_won,
            trades_lost,
            win_rate,
            avg_win,
            avg_loss,
            profit_ratio,
            largest_win,
            largest_loss,
            avg_holding_days,
            bars: equity_curve.len(),
        }
    }
}

/// Mean over population stddev of bar-over-bar equity returns, zero risk-free rate.
fn compute_sharpe(equity_curve: &[EquityPoint]) -> Option<f64> {
    if equity_curve.len() < 2 {
        return None;
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    (stddev > 0.0).then(|| mean / stddev)
}

/// System Quality Number: sqrt(n) * mean(pnl) / sample stddev(pnl).
fn compute_sqn(pnls: &[f64]) -> Option<f64> {
    if pnls.len() < 2 {
        return None;
    }
    let n = pnls.len() as f64;
    let mean = pnls.iter().sum::<f64>() / n;
    let variance = pnls.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    (stddev > 0.0).then(|| n.sqrt() * mean / stddev)
}
