use std::future::Future;

use crate::{MeasurementSeries, Result};

/// Result of one trial, as seen by an observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    /// Zero-based trial index.
    pub index: u32,
    pub trials: u32,
    /// `None` when the trial failed and was excluded.
    pub value: Option<f64>,
}

/// Run `trials` trials one after another and collect the successful measurements.
///
/// A failing trial is logged and skipped; it is neither retried nor allowed to abort the run,
/// so the returned series may be shorter than `trials` (or empty).
pub async fn run_trials<F, Fut>(label: &str, trials: u32, trial: F) -> MeasurementSeries
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<f64>>,
{
    run_trials_observed(label, trials, trial, |_| {}).await
}

/// Like [`run_trials`], calling `observe` after every trial.
pub async fn run_trials_observed<F, Fut, O>(
    label: &str,
    trials: u32,
    mut trial: F,
    mut observe: O,
) -> MeasurementSeries
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<f64>>,
    O: FnMut(TrialOutcome),
{
    let mut series = MeasurementSeries::with_capacity(trials as usize);

    for index in 0..trials {
        let res = trial(index).await.and_then(|v| series.push(v).map(|()| v));

        let value = match res {
            Ok(v) => {
                tracing::debug!(trial = label, index, value = v, "trial complete");
                Some(v)
            }
            Err(err) => {
                tracing::warn!(
                    trial = label,
                    index,
                    kind = %err.kind(),
                    phase = err.phase().map(tracing::field::display),
                    "trial excluded: {err}"
                );
                None
            }
        };

        observe(TrialOutcome {
            index,
            trials,
            value,
        });
    }

    series
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::Error;
    use std::cell::Cell;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn always_failing_trials_yield_empty_series() {
        let series = run_trials("latency", 5, |_| async {
            Err(Error::Degenerate("always".to_string()))
        })
        .await;
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn failures_are_skipped_and_order_is_kept() {
        // Every 3rd trial (indices 2, 5, 8) fails.
        let series = run_trials("download 1MB", 10, |i| async move {
            if (i + 1).is_multiple_of(3) {
                Err(Error::Degenerate(format!("trial {i}")))
            } else {
                Ok(f64::from(i))
            }
        })
        .await;

        assert_eq!(series.len(), 7);
        assert_eq!(series.as_slice(), &[0.0, 1.0, 3.0, 4.0, 6.0, 7.0, 9.0]);
    }

    #[tokio::test]
    async fn out_of_domain_values_are_excluded() {
        let series = run_trials("upload", 3, |i| async move {
            Ok(if i == 1 { f64::INFINITY } else { 2.0 })
        })
        .await;
        assert_eq!(series.as_slice(), &[2.0, 2.0]);
    }

    #[tokio::test]
    async fn trials_run_strictly_in_sequence() {
        let in_flight = Cell::new(0u32);
        let max_in_flight = Cell::new(0u32);

        let series = run_trials("seq", 4, |_| {
            let in_flight = &in_flight;
            let max_in_flight = &max_in_flight;
            async move {
                in_flight.set(in_flight.get() + 1);
                max_in_flight.set(max_in_flight.get().max(in_flight.get()));
                tokio::task::yield_now().await;
                in_flight.set(in_flight.get() - 1);
                Ok(1.0)
            }
        })
        .await;

        assert_eq!(series.len(), 4);
        assert_eq!(max_in_flight.get(), 1);
    }

    #[tokio::test]
    async fn observer_sees_every_trial() {
        let mut seen = Vec::new();
        let _ = run_trials_observed(
            "obs",
            3,
            |i| async move {
                if i == 0 {
                    Err(Error::Degenerate("first".to_string()))
                } else {
                    Ok(5.0)
                }
            },
            |o| seen.push(o),
        )
        .await;

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].value, None);
        assert_eq!(seen[1].value, Some(5.0));
        assert!(seen.iter().all(|o| o.trials == 3));
    }

    #[tokio::test]
    async fn excluded_trials_log_the_phase_by_name() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let series = run_trials("latency", 2, |i| async move {
            if i == 0 {
                Err(Error::Http(speedr_http::Error::Timeout {
                    phase: speedr_http::Phase::Dns,
                    after: Duration::from_secs(1),
                }))
            } else {
                Err(Error::Degenerate("negative latency".to_string()))
            }
        })
        .await;
        assert!(series.is_empty());

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = logs.lines().collect();
        assert_eq!(lines.len(), 2, "{logs}");
        assert!(lines[0].contains("phase=dns"), "{logs}");
        assert!(!lines[1].contains("phase="), "{logs}");
    }
}
