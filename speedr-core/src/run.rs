use std::sync::Arc;

use speedr_http::{HttpClient, TimedClient, TimedTransaction};
use speedr_stats::Summary;

use crate::Result;
use crate::bench::{Bench, Endpoints, Transport, download_mbps, latency_ms, upload_mbps};
use crate::config::{Plan, RunConfig, Tier};
use crate::meta::{Directory, HttpDirectory, UNKNOWN_LABEL};
use crate::report::{BenchmarkReport, ReportDraft, SpeedEntry};
use crate::series::MeasurementSeries;
use crate::trials::{TrialOutcome, run_trials_observed};

const LATENCY_LABEL: &str = "latency";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Download,
    Upload,
}

/// Progress notifications, emitted in run order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The latency trials are about to start (they run alongside the metadata lookups).
    LatencyStarted { trials: u32 },
    Located {
        server_location: String,
        your_ip: String,
    },
    Latency(Summary),
    TierStarted { direction: Direction, tier: Tier },
    TrialFinished {
        label: String,
        outcome: TrialOutcome,
    },
    TierFinished {
        direction: Direction,
        entry: SpeedEntry,
    },
    Overall {
        direction: Direction,
        speed_mbps: f64,
    },
}

pub type ProgressFn = Arc<dyn Fn(Event) + Send + Sync + 'static>;

struct RunContext {
    progress: Option<ProgressFn>,
    draft: ReportDraft,
}

impl RunContext {
    fn emit(&self, event: Event) {
        if let Some(progress) = &self.progress {
            progress(event);
        }
    }
}

/// Sequences one full run: latency and metadata, then the download and upload sweeps.
pub struct Runner<T, D> {
    bench: Bench<T>,
    directory: D,
    plan: Plan,
}

impl<T: Transport, D: Directory> Runner<T, D> {
    pub fn new(bench: Bench<T>, directory: D, plan: Plan) -> Result<Self> {
        plan.validate()?;
        Ok(Self {
            bench,
            directory,
            plan,
        })
    }

    /// Trial failures never abort the run; a tier with no surviving trials reports NaN.
    pub async fn run(&self, progress: Option<ProgressFn>) -> BenchmarkReport {
        let mut ctx = RunContext {
            progress,
            draft: ReportDraft::default(),
        };

        ctx.emit(Event::LatencyStarted {
            trials: self.plan.latency.trials,
        });

        let (latency, locations, trace) = {
            let ctx = &ctx;
            tokio::join!(
                run_trials_observed(
                    LATENCY_LABEL,
                    self.plan.latency.trials,
                    |_| self.measure_latency(self.plan.latency.bytes),
                    |outcome| ctx.emit(Event::TrialFinished {
                        label: LATENCY_LABEL.to_string(),
                        outcome,
                    }),
                ),
                self.directory.locations(),
                self.directory.trace(),
            )
        };

        let locations = locations.unwrap_or_else(|err| {
            tracing::warn!(kind = %err.kind(), "location lookup failed: {err}");
            Vec::new()
        });
        let (server_location, your_ip) = match trace {
            Ok(trace) => (
                trace.server_location_label(&locations),
                trace.your_ip_label(),
            ),
            Err(err) => {
                tracing::warn!(kind = %err.kind(), "trace lookup failed: {err}");
                (UNKNOWN_LABEL.to_string(), UNKNOWN_LABEL.to_string())
            }
        };

        ctx.draft.server_location = server_location.clone();
        ctx.draft.your_ip = your_ip.clone();
        ctx.emit(Event::Located {
            server_location,
            your_ip,
        });

        let latency = latency.summary();
        tracing::info!(
            samples = latency.count,
            median_ms = latency.median,
            jitter_ms = latency.jitter,
            "latency trials complete"
        );
        ctx.draft.latency = latency;
        ctx.emit(Event::Latency(latency));

        let (entries, overall) = self
            .sweep(&ctx, Direction::Download, &self.plan.download)
            .await;
        ctx.draft.download = entries;
        ctx.draft.download_overall = overall;

        let (entries, overall) = self.sweep(&ctx, Direction::Upload, &self.plan.upload).await;
        ctx.draft.upload = entries;
        ctx.draft.upload_overall = overall;

        ctx.draft.finish()
    }

    async fn sweep(
        &self,
        ctx: &RunContext,
        direction: Direction,
        tiers: &[Tier],
    ) -> (Vec<SpeedEntry>, f64) {
        let mut entries = Vec::with_capacity(tiers.len());
        let mut all = Vec::with_capacity(tiers.len());

        for tier in tiers {
            ctx.emit(Event::TierStarted {
                direction,
                tier: tier.clone(),
            });

            let label = format!("{direction} {}", tier.label);
            let bytes = tier.bytes;
            let series = run_trials_observed(
                &label,
                tier.trials,
                |_| self.measure(direction, bytes),
                |outcome| {
                    ctx.emit(Event::TrialFinished {
                        label: label.clone(),
                        outcome,
                    })
                },
            )
            .await;

            let entry = SpeedEntry {
                size: tier.label.clone(),
                speed_mbps: series.median(),
                samples: series.len(),
            };
            tracing::info!(
                %direction,
                tier = %tier.label,
                samples = entry.samples,
                median_mbps = entry.speed_mbps,
                "tier complete"
            );

            ctx.emit(Event::TierFinished {
                direction,
                entry: entry.clone(),
            });
            entries.push(entry);
            all.push(series);
        }

        let overall = MeasurementSeries::concat(&all).quantile(self.plan.overall_quantile);
        ctx.emit(Event::Overall {
            direction,
            speed_mbps: overall,
        });

        (entries, overall)
    }

    async fn measure_latency(&self, bytes: u64) -> Result<f64> {
        let tx = self.bench.download(bytes).await?;
        log_phases(LATENCY_LABEL, &tx);
        latency_ms(&tx)
    }

    async fn measure(&self, direction: Direction, bytes: u64) -> Result<f64> {
        match direction {
            Direction::Download => {
                let tx = self.bench.download(bytes).await?;
                log_phases("download", &tx);
                download_mbps(bytes, &tx)
            }
            Direction::Upload => {
                let tx = self.bench.upload(bytes).await?;
                log_phases("upload", &tx);
                upload_mbps(bytes, &tx)
            }
        }
    }
}

fn log_phases(trial: &str, tx: &TimedTransaction) {
    tracing::debug!(
        trial,
        dns = ?tx.dns(),
        tcp_connect = ?tx.tcp_connect(),
        tls_handshake = ?tx.tls_handshake(),
        ttfb = ?tx.time_to_first_byte(),
        transfer = ?tx.transfer(),
        server_ms = tx.server_processing_ms,
        body_bytes = tx.body_bytes,
        "transaction phases"
    );
}

/// Run the whole plan against `cfg.base_url` with fresh-connection measurements.
pub async fn run(cfg: &RunConfig, progress: Option<ProgressFn>) -> Result<BenchmarkReport> {
    let endpoints = Endpoints::new(&cfg.base_url)?;
    let transport = TimedClient::with_server_timing_metric(&cfg.server_timing_metric)?;
    let directory = HttpDirectory::new(HttpClient::default(), endpoints.clone(), cfg.timeout);
    let bench = Bench::new(transport, endpoints, cfg.timeout);

    let runner = Runner::new(bench, directory, cfg.plan.clone())?;
    Ok(runner.run(progress).await)
}
