use crate::{average, jitter, max, median, min};

/// Min/max/average/median/jitter of one sample set.
///
/// An empty sample set produces NaN in every field; `count` tells the two cases apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub median: f64,
    pub jitter: f64,
    pub count: usize,
}

impl Summary {
    #[must_use]
    pub fn of(samples: &[f64]) -> Self {
        Self {
            min: min(samples).unwrap_or(f64::NAN),
            max: max(samples).unwrap_or(f64::NAN),
            average: average(samples).unwrap_or(f64::NAN),
            median: median(samples).unwrap_or(f64::NAN),
            jitter: jitter(samples).unwrap_or(f64::NAN),
            count: samples.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
