//! Fast/slow moving-average crossover detection.
//!
//! Up fires on the bar where fast moves strictly above slow after being at or
//! below it; Down is the mirror. Ties carry the last strict side forward, so a
//! fast line that touches the slow line and moves back does not re-fire.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cross {
    Up,
    Down,
    #[default]
    None,
}

impl fmt::Display for Cross {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cross::Up => write!(f, "golden cross"),
            Cross::Down => write!(f, "death cross"),
            Cross::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Above,
    Below,
}

#[derive(Debug, Clone, Default)]
pub struct CrossoverDetector {
    has_previous: bool,
    last_side: Option<Side>,
}

impl CrossoverDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this bar's averages. Either side absent means no signal, and the
    /// next defined bar cannot cross because it has no defined predecessor.
    pub fn update(&mut self, fast: Option<f64>, slow: Option<f64>) -> Cross {
        let (fast, slow) = match (fast, slow) {
            (Some(f), Some(s)) => (f, s),
            _ => {
                self.has_previous = false;
                self.last_side = None;
                return Cross::None;
            }
        };

        let side = if fast > slow {
            Some(Side::Above)
        } else if fast < slow {
            Some(Side::Below)
        } else {
            None
        };

        let cross = if !self.has_previous {
            Cross::None
        } else {
            match (side, self.last_side) {
                (Some(Side::Above), last) if last != Some(Side::Above) => Cross::Up,
                (Some(Side::Below), last) if last != Some(Side::Below) => Cross::Down,
                _ => Cross::None,
            }
        };

        self.has_previous = true;
        if side.is_some() {
            self.last_side = side;
        }
        cross
    }
}
