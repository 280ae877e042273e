//! Moving-average slope: MA[i] - MA[i - period].

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Slope {
    period: usize,
    history: VecDeque<f64>,
}

impl Slope {
    pub fn new(period: usize) -> Self {
        Slope {
            period,
            history: VecDeque::with_capacity(period + 1),
        }
    }

    /// Feed the current average. An absent average clears the history, since
    /// the lag must count defined bars only.
    pub fn push(&mut self, value: Option<f64>) -> Option<f64> {
        let Some(current) = value else {
            self.history.clear();
            return None;
        };
        if self.period == 0 {
            return None;
        }
        self.history.push_back(current);
        if self.history.len() > self.period + 1 {
            self.history.pop_front();
        }
        if self.history.len() == self.period + 1 {
            self.history.front().map(|lagged| current - lagged)
        } else {
            None
        }
    }
}
