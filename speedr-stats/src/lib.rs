#![forbid(unsafe_code)]

//! Order statistics over small sample sets.
//!
//! All functions take the samples in their original (collection) order and never mutate them.
//! Empty input yields `None`; callers decide which sentinel to render.

mod summary;

pub use summary::Summary;

#[must_use]
pub fn average(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

#[must_use]
pub fn min(samples: &[f64]) -> Option<f64> {
    samples.iter().copied().reduce(f64::min)
}

#[must_use]
pub fn max(samples: &[f64]) -> Option<f64> {
    samples.iter().copied().reduce(f64::max)
}

/// Middle value; for an even count, the mean of the two central values.
#[must_use]
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let sorted = sorted_copy(samples);
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Mean absolute difference between consecutive samples.
///
/// This measures sample-to-sample variability, so the input order matters. A single sample has
/// zero jitter.
#[must_use]
pub fn jitter(samples: &[f64]) -> Option<f64> {
    match samples.len() {
        0 => None,
        1 => Some(0.0),
        n => {
            let total: f64 = samples.windows(2).map(|w| (w[0] - w[1]).abs()).sum();
            Some(total / (n - 1) as f64)
        }
    }
}

/// Quantile with linear interpolation between the two nearest ranks at `q * (n - 1)`.
///
/// `q` must be within `[0, 1]`.
#[must_use]
pub fn quantile(samples: &[f64], q: f64) -> Option<f64> {
    if samples.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let sorted = sorted_copy(samples);
    let pos = q * (sorted.len() - 1) as f64;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;

    match sorted.get(base + 1) {
        Some(next) => Some(sorted[base] + rest * (next - sorted[base])),
        None => Some(sorted[base]),
    }
}

fn sorted_copy(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn median_handles_odd_and_even_lengths() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(median(&[5.0, 1.0, 4.0]), Some(4.0));
    }

    #[test]
    fn median_does_not_reorder_input() {
        let samples = vec![3.0, 1.0, 2.0];
        let _ = median(&samples);
        assert_eq!(samples, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn jitter_uses_original_order() {
        assert_eq!(jitter(&[10.0, 10.0, 10.0]), Some(0.0));
        assert_eq!(jitter(&[10.0, 20.0]), Some(10.0));
        assert_eq!(jitter(&[42.0]), Some(0.0));

        // Sorted this would be [1, 2, 3] with jitter 1.0.
        assert_eq!(jitter(&[1.0, 3.0, 2.0]), Some(1.5));
    }

    #[test]
    fn quantile_bounds_are_min_and_max() {
        let samples = [7.5, 1.0, 9.25, 3.0, 3.0, 12.0];
        assert_eq!(quantile(&samples, 0.0), min(&samples));
        assert_eq!(quantile(&samples, 1.0), max(&samples));
    }

    #[test]
    fn quantile_interpolates_between_ranks() {
        // Sorted: [1, 2, 3, 4, 5, 6, 7, 8, 9, 10], pos = 0.9 * 9 = 8.1.
        let samples: Vec<f64> = (1..=10).rev().map(f64::from).collect();
        let p90 = quantile(&samples, 0.9).unwrap();
        assert!(approx_eq(p90, 9.1), "p90={p90}");

        assert_eq!(quantile(&[4.0], 0.9), Some(4.0));
    }

    #[test]
    fn quantile_rejects_out_of_range() {
        assert_eq!(quantile(&[1.0, 2.0], 1.5), None);
        assert_eq!(quantile(&[1.0, 2.0], -0.1), None);
        assert_eq!(quantile(&[1.0, 2.0], f64::NAN), None);
    }

    #[test]
    fn empty_input_has_no_statistics() {
        assert_eq!(average(&[]), None);
        assert_eq!(median(&[]), None);
        assert_eq!(jitter(&[]), None);
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(min(&[]), None);
        assert_eq!(max(&[]), None);
    }

    #[test]
    fn central_values_lie_within_range() {
        let sets: [&[f64]; 4] = [
            &[1.0],
            &[3.0, 1.0],
            &[0.0, 100.0, 50.0, 25.0, 99.0],
            &[12.5, 12.5, 80.0, 0.25, 7.0, 7.0, 64.0],
        ];

        for s in sets {
            let (lo, hi) = (min(s).unwrap(), max(s).unwrap());
            let med = median(s).unwrap();
            let avg = average(s).unwrap();
            assert!(lo <= med && med <= hi, "median {med} outside [{lo}, {hi}]");
            assert!(lo <= avg && avg <= hi, "average {avg} outside [{lo}, {hi}]");
        }
    }
}
