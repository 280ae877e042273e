//! Stop-loss and trailing-stop overlay.
//!
//! Checked once per bar while long, before any signal logic. A triggered stop
//! exits the full position and the strategy does nothing else that bar.

use tracing::debug;

use super::position::ExitReason;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskParams {
    pub enabled: bool,
    /// Fraction below entry; 0 disables the leg.
    pub stop_loss_pct: f64,
    /// Fraction below the highest close since entry; 0 disables the leg.
    pub trail_stop_pct: f64,
}

/// A forced exit and the level that caused it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskExit {
    pub reason: ExitReason,
    pub trigger_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskOverlay {
    params: RiskParams,
    highest_price_since_entry: Option<f64>,
}

impl RiskOverlay {
    pub fn new(params: RiskParams) -> Self {
        RiskOverlay {
            params,
            highest_price_since_entry: None,
        }
    }

    pub fn highest_price_since_entry(&self) -> Option<f64> {
        self.highest_price_since_entry
    }

    /// Start tracking a new position from its fill price.
    pub fn on_entry(&mut self, fill_price: f64) {
        self.highest_price_since_entry = Some(fill_price);
    }

    pub fn on_exit(&mut self) {
        self.highest_price_since_entry = None;
    }

    pub fn stop_loss_price(&self, entry_price: f64) -> Option<f64> {
        (self.params.stop_loss_pct > 0.0).then(|| entry_price * (1.0 - self.params.stop_loss_pct))
    }

    pub fn trailing_stop_price(&self) -> Option<f64> {
        if self.params.trail_stop_pct <= 0.0 {
            return None;
        }
        self.highest_price_since_entry
            .map(|high| high * (1.0 - self.params.trail_stop_pct))
    }

    /// Raise the high-water mark with this close, then test both stops.
    pub fn evaluate(&mut self, entry_price: f64, close: f64) -> Option<RiskExit> {
        let high = self
            .highest_price_since_entry
            .map_or(close, |h| h.max(close));
        self.highest_price_since_entry = Some(high);

        if !self.params.enabled {
            return None;
        }

        let stop = self.stop_loss_price(entry_price);
        let trail = self.trailing_stop_price();
        let (reason, level) = match (stop, trail) {
            (Some(s), Some(t)) if s >= t => (ExitReason::StopLoss, s),
            (_, Some(t)) => (ExitReason::TrailingStop, t),
            (Some(s), None) => (ExitReason::StopLoss, s),
            (None, None) => return None,
        };

        if close <= level {
            debug!(close, level, %reason, "risk overlay triggered");
            Some(RiskExit {
                reason,
                trigger_price: level,
            })
        } else {
            None
        }
    }
}
