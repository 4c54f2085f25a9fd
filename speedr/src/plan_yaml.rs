use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;
use speedr_core::{LatencyPlan, RunConfig, Tier};

/// Plan file. Every key is optional; present keys replace the defaults wholesale (a `download`
/// list replaces the whole download table).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct PlanYaml {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub timeout: Option<YamlDuration>,

    #[serde(default)]
    pub server_timing_metric: Option<String>,

    #[serde(default)]
    pub overall_quantile: Option<f64>,

    #[serde(default)]
    pub latency: Option<LatencyYaml>,

    #[serde(default)]
    pub download: Option<Vec<TierYaml>>,

    #[serde(default)]
    pub upload: Option<Vec<TierYaml>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct LatencyYaml {
    pub bytes: u64,
    pub trials: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct TierYaml {
    /// Defaults to a size label derived from `bytes`.
    #[serde(default)]
    pub label: Option<String>,
    pub bytes: u64,
    pub trials: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    fn into_inner(self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 30s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v == 0 {
                    return Err(E::custom("duration must be positive"));
                }
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v <= 0 {
                    return Err(E::custom("duration must be positive"));
                }
                Ok(YamlDuration(Duration::from_secs(v as u64)))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v <= 0.0 {
                    return Err(E::custom("duration must be a positive, finite number"));
                }
                Ok(YamlDuration(Duration::from_secs_f64(v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v).map_err(E::custom)?;
                if d.is_zero() {
                    return Err(E::custom("duration must be positive"));
                }
                Ok(YamlDuration(d))
            }
        }

        deserializer.deserialize_any(V)
    }
}

impl PlanYaml {
    pub(crate) fn apply(self, cfg: &mut RunConfig) {
        let PlanYaml {
            base_url,
            timeout,
            server_timing_metric,
            overall_quantile,
            latency,
            download,
            upload,
        } = self;

        if let Some(v) = base_url {
            cfg.base_url = v;
        }
        if let Some(v) = timeout {
            cfg.timeout = Some(v.into_inner());
        }
        if let Some(v) = server_timing_metric {
            cfg.server_timing_metric = v;
        }
        if let Some(v) = overall_quantile {
            cfg.plan.overall_quantile = v;
        }
        if let Some(v) = latency {
            cfg.plan.latency = LatencyPlan {
                bytes: v.bytes,
                trials: v.trials,
            };
        }
        if let Some(v) = download {
            cfg.plan.download = v.into_iter().map(TierYaml::into_tier).collect();
        }
        if let Some(v) = upload {
            cfg.plan.upload = v.into_iter().map(TierYaml::into_tier).collect();
        }
    }
}

impl TierYaml {
    fn into_tier(self) -> Tier {
        let label = self.label.unwrap_or_else(|| size_label(self.bytes));
        Tier::new(label, self.bytes, self.trials)
    }
}

/// `101000` -> `101kB`, `1001000` -> `1MB`, `512` -> `512B`. Decimal units, truncated.
fn size_label(bytes: u64) -> String {
    const KB: u64 = 1000;
    const MB: u64 = 1000 * 1000;
    const GB: u64 = 1000 * 1000 * 1000;

    if bytes >= GB {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB {
        format!("{}kB", bytes / KB)
    } else {
        format!("{bytes}B")
    }
}

pub(crate) async fn load_plan_yaml(path: &Path) -> anyhow::Result<PlanYaml> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read plan YAML: {}", path.display()))?;

    serde_yaml::from_slice(&bytes)
        .with_context(|| format!("failed to parse plan YAML: {}", path.display()))
}
