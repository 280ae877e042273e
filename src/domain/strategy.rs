//! Moving-average crossover strategy state machine.
//!
//! Per bar, in order: insufficient history -> no-op; LONG and a risk exit ->
//! sell; FLAT and golden cross (plus optional breadth gate) -> buy; LONG and
//! death cross -> sell; otherwise hold. The state only moves when the broker
//! confirms the fill.

use std::fmt;

use super::indicator::{Cross, IndicatorSnapshot};
use super::position::ExitReason;
use super::risk::RiskExit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyState {
    #[default]
    Flat,
    Long,
}

impl fmt::Display for StrategyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyState::Flat => write!(f, "FLAT"),
            StrategyState::Long => write!(f, "LONG"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Hold,
    Enter,
    Exit(ExitReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreadthFilter {
    pub enabled: bool,
    /// Entry allowed only when at most this many trailing closes are below the open.
    pub max_lower_days: usize,
}

impl BreadthFilter {
    pub fn disabled() -> Self {
        BreadthFilter {
            enabled: false,
            max_lower_days: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaCrossStrategy {
    breadth: BreadthFilter,
    state: StrategyState,
}

impl MaCrossStrategy {
    pub fn new(breadth: BreadthFilter) -> Self {
        MaCrossStrategy {
            breadth,
            state: StrategyState::Flat,
        }
    }

    pub fn state(&self) -> StrategyState {
        self.state
    }

    fn has_history(&self, snapshot: &IndicatorSnapshot) -> bool {
        snapshot.has_averages() && (!self.breadth.enabled || snapshot.percentile_rank.is_some())
    }

    fn breadth_allows(&self, snapshot: &IndicatorSnapshot) -> bool {
        if !self.breadth.enabled {
            return true;
        }
        snapshot
            .percentile_rank
            .is_some_and(|lower_days| lower_days <= self.breadth.max_lower_days)
    }

    pub fn decide(&self, snapshot: &IndicatorSnapshot, risk_exit: Option<RiskExit>) -> Decision {
        if !self.has_history(snapshot) {
            return Decision::Hold;
        }

        match self.state {
            StrategyState::Long => {
                if let Some(exit) = risk_exit {
                    Decision::Exit(exit.reason)
                } else if snapshot.crossover == Cross::Down {
                    Decision::Exit(ExitReason::Signal)
                } else {
                    Decision::Hold
                }
            }
            StrategyState::Flat => {
                if snapshot.crossover == Cross::Up && self.breadth_allows(snapshot) {
                    Decision::Enter
                } else {
                    Decision::Hold
                }
            }
        }
    }

    /// The broker accepted the buy.
    pub fn on_entry_filled(&mut self) {
        self.state = StrategyState::Long;
    }

    /// The broker accepted the closing sell.
    pub fn on_exit_filled(&mut self) {
        self.state = StrategyState::Flat;
    }
}
