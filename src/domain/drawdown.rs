//! Running peak-to-trough drawdown with finalized episodes.
//!
//! An episode opens on the first bar below the running peak and closes only
//! when equity gets back to that peak. A plateau below the peak is still in
//! drawdown.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownEpisode {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub magnitude_pct: f64,
    pub duration_days: i64,
}

/// Episode still below its peak when the run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenDrawdown {
    pub start_date: NaiveDate,
    pub last_date: NaiveDate,
    pub magnitude_pct: f64,
    pub current_pct: f64,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Open {
    start_date: NaiveDate,
    depth_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawdownTracker {
    peak: Option<f64>,
    current_pct: f64,
    max_drawdown_pct: f64,
    max_duration_days: i64,
    open: Option<Open>,
    last_date: Option<NaiveDate>,
    episodes: Vec<DrawdownEpisode>,
}

impl DrawdownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peak(&self) -> Option<f64> {
        self.peak
    }

    pub fn current_drawdown_pct(&self) -> f64 {
        self.current_pct
    }

    pub fn max_drawdown_pct(&self) -> f64 {
        self.max_drawdown_pct
    }

    /// Longest episode so far, the open one included.
    pub fn max_duration_days(&self) -> i64 {
        let open = match (self.open, self.last_date) {
            (Some(open), Some(last)) => (last - open.start_date).num_days(),
            _ => 0,
        };
        self.max_duration_days.max(open)
    }

    pub fn episodes(&self) -> &[DrawdownEpisode] {
        &self.episodes
    }

    pub fn update(&mut self, date: NaiveDate, equity: f64) {
        self.last_date = Some(date);

        let peak = match self.peak {
            Some(p) => p,
            None => {
                self.peak = Some(equity);
                return;
            }
        };

        if equity >= peak {
            if let Some(open) = self.open.take() {
                let duration_days = (date - open.start_date).num_days();
                self.max_duration_days = self.max_duration_days.max(duration_days);
                self.episodes.push(DrawdownEpisode {
                    start_date: open.start_date,
                    end_date: date,
                    magnitude_pct: open.depth_pct,
                    duration_days,
                });
            }
            self.peak = Some(equity);
            self.current_pct = 0.0;
            return;
        }

        let drawdown_pct = if peak > 0.0 {
            (peak - equity) / peak * 100.0
        } else {
            0.0
        };
        self.current_pct = drawdown_pct;
        self.max_drawdown_pct = self.max_drawdown_pct.max(drawdown_pct);

        match self.open.as_mut() {
            Some(open) => open.depth_pct = open.depth_pct.max(drawdown_pct),
            None => {
                self.open = Some(Open {
                    start_date: date,
                    depth_pct: drawdown_pct,
                })
            }
        }
    }

    /// The unfinished episode at the end of the run, if any.
    pub fn open_episode(&self) -> Option<OpenDrawdown> {
        let open = self.open?;
        let last_date = self.last_date?;
        Some(OpenDrawdown {
            start_date: open.start_date,
            last_date,
            magnitude_pct: open.depth_pct,
            current_pct: self.current_pct,
            duration_days: (last_date - open.start_date).num_days(),
        })
    }
}
