use speedr_stats::Summary;

use crate::{Error, Result};

/// Measurements of one trial run, in the order the trials completed.
///
/// Every element is finite and non-negative; failed trials leave no entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSeries {
    values: Vec<f64>,
}

impl MeasurementSeries {
    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            values: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::Degenerate(format!(
                "measurement {value} is not a finite non-negative number"
            )));
        }
        self.values.push(value);
        Ok(())
    }

    /// Concatenate several series, preserving order.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a MeasurementSeries>) -> Self {
        Self {
            values: parts
                .into_iter()
                .flat_map(|s| s.values.iter().copied())
                .collect(),
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary::of(&self.values)
    }

    /// NaN when empty.
    #[must_use]
    pub fn median(&self) -> f64 {
        speedr_stats::median(&self.values).unwrap_or(f64::NAN)
    }

    /// NaN when empty.
    #[must_use]
    pub fn quantile(&self, q: f64) -> f64 {
        speedr_stats::quantile(&self.values, q).unwrap_or(f64::NAN)
    }
}
