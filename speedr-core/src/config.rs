use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://speed.cloudflare.com";

/// Quantile used for the overall download/upload figure.
pub const DEFAULT_OVERALL_QUANTILE: f64 = 0.9;

/// Small downloads timed for latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyPlan {
    pub bytes: u64,
    pub trials: u32,
}

impl Default for LatencyPlan {
    fn default() -> Self {
        Self {
            bytes: 1000,
            trials: 20,
        }
    }
}

/// One payload size of a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    pub label: String,
    pub bytes: u64,
    pub trials: u32,
}

impl Tier {
    pub fn new(label: impl Into<String>, bytes: u64, trials: u32) -> Self {
        Self {
            label: label.into(),
            bytes,
            trials,
        }
    }
}

/// The full test plan.
///
/// Within a sweep, payloads never shrink and trial counts never grow, which keeps the wall-clock
/// time of a run bounded.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub latency: LatencyPlan,
    pub download: Vec<Tier>,
    pub upload: Vec<Tier>,
    pub overall_quantile: f64,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            latency: LatencyPlan::default(),
            download: vec![
                Tier::new("100kB", 101_000, 10),
                Tier::new("1MB", 1_001_000, 8),
                Tier::new("10MB", 10_001_000, 6),
                Tier::new("25MB", 25_001_000, 4),
                Tier::new("100MB", 100_001_000, 1),
            ],
            upload: vec![
                Tier::new("11kB", 11_000, 10),
                Tier::new("100kB", 101_000, 10),
                Tier::new("1MB", 1_001_000, 8),
            ],
            overall_quantile: DEFAULT_OVERALL_QUANTILE,
        }
    }
}

impl Plan {
    pub fn validate(&self) -> Result<()> {
        if self.latency.bytes == 0 || self.latency.trials == 0 {
            return Err(Error::InvalidPlan(
                "latency plan needs a positive size and trial count".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.overall_quantile) {
            return Err(Error::InvalidPlan(format!(
                "overall quantile {} is outside [0, 1]",
                self.overall_quantile
            )));
        }

        validate_sweep("download", &self.download)?;
        validate_sweep("upload", &self.upload)
    }
}

fn validate_sweep(name: &str, tiers: &[Tier]) -> Result<()> {
    for t in tiers {
        if t.label.trim().is_empty() {
            return Err(Error::InvalidPlan(format!("{name} tier without a label")));
        }
        if t.label == "overall" {
            return Err(Error::InvalidPlan(format!(
                "{name} tier label `overall` is reserved"
            )));
        }
        if t.bytes == 0 || t.trials == 0 {
            return Err(Error::InvalidPlan(format!(
                "{name} tier {} needs a positive size and trial count",
                t.label
            )));
        }
    }

    for pair in tiers.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if b.bytes < a.bytes {
            return Err(Error::InvalidPlan(format!(
                "{name} tiers must not shrink: {} ({} B) follows {} ({} B)",
                b.label, b.bytes, a.label, a.bytes
            )));
        }
        if b.trials > a.trials {
            return Err(Error::InvalidPlan(format!(
                "{name} tier {} has more trials ({}) than the smaller {} ({})",
                b.label, b.trials, a.label, a.trials
            )));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub base_url: String,
    /// Per-transaction deadline. `None` lets each request run to completion.
    pub timeout: Option<Duration>,
    pub server_timing_metric: String,
    pub plan: Plan,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            server_timing_metric: speedr_http::DEFAULT_SERVER_TIMING_METRIC.to_string(),
            plan: Plan::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_is_valid() {
        let plan = Plan::default();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.latency.trials, 20);
        assert_eq!(plan.download.len(), 5);
        assert_eq!(plan.upload.len(), 3);
        assert_eq!(plan.overall_quantile, 0.9);
    }

    #[test]
    fn shrinking_sizes_are_rejected() {
        let plan = Plan {
            download: vec![
                Tier::new("1MB", 1_001_000, 8),
                Tier::new("100kB", 101_000, 8),
            ],
            ..Plan::default()
        };
        assert!(matches!(plan.validate(), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn plateaued_sizes_are_allowed() {
        let plan = Plan {
            download: vec![
                Tier::new("25MB", 25_001_000, 4),
                Tier::new("25MB again", 25_001_000, 2),
            ],
            ..Plan::default()
        };
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn growing_trial_counts_are_rejected() {
        let plan = Plan {
            upload: vec![Tier::new("11kB", 11_000, 2), Tier::new("100kB", 101_000, 3)],
            ..Plan::default()
        };
        assert!(matches!(plan.validate(), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn empty_and_reserved_tiers_are_rejected() {
        let zero = Plan {
            upload: vec![Tier::new("0B", 0, 1)],
            ..Plan::default()
        };
        assert!(zero.validate().is_err());

        let reserved = Plan {
            download: vec![Tier::new("overall", 10, 1)],
            ..Plan::default()
        };
        assert!(reserved.validate().is_err());

        let quantile = Plan {
            overall_quantile: 1.5,
            ..Plan::default()
        };
        assert!(quantile.validate().is_err());
    }

    #[test]
    fn empty_sweeps_are_allowed() {
        let plan = Plan {
            download: Vec::new(),
            upload: Vec::new(),
            ..Plan::default()
        };
        assert!(plan.validate().is_ok());
    }
}
