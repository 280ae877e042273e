//! Breadth filter: how many trailing closes sit strictly below today's open.
//!
//! The window holds the last `lookback` closes including the current bar. It is
//! kept sorted so the count is a binary search instead of a scan. The threshold
//! moves with every bar, so the count itself cannot be carried forward: each
//! push is O(log lookback) to search plus an O(lookback) shift of the sorted
//! buffer on insert and evict.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct BreadthWindow {
    lookback: usize,
    arrival: VecDeque<f64>,
    sorted: Vec<f64>,
}

impl BreadthWindow {
    pub fn new(lookback: usize) -> Self {
        BreadthWindow {
            lookback,
            arrival: VecDeque::with_capacity(lookback + 1),
            sorted: Vec::with_capacity(lookback + 1),
        }
    }

    /// Add the bar's close and return the lower-close count against its open,
    /// or `None` while the window is not yet full.
    pub fn push(&mut self, open: f64, close: f64) -> Option<usize> {
        if self.lookback == 0 {
            return None;
        }

        self.arrival.push_back(close);
        let at = self.sorted.partition_point(|c| *c < close);
        self.sorted.insert(at, close);

        if self.arrival.len() > self.lookback {
            if let Some(old) = self.arrival.pop_front() {
                let at = self.sorted.partition_point(|c| *c < old);
                self.sorted.remove(at);
            }
        }

        if self.arrival.len() == self.lookback {
            Some(self.sorted.partition_point(|c| *c < open))
        } else {
            None
        }
    }
}
