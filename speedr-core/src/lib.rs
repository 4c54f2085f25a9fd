#![forbid(unsafe_code)]

mod bench;
mod config;
mod error;
mod meta;
mod report;
mod run;
mod series;
mod trials;

pub use bench::{
    Bench, Endpoints, Transport, download_mbps, latency_ms, throughput_mbps, upload_mbps,
};
pub use config::{DEFAULT_BASE_URL, LatencyPlan, Plan, RunConfig, Tier};
pub use error::{Error, FailureKind, Result};
pub use meta::{Directory, HttpDirectory, Location, Trace, UNKNOWN_LABEL};
pub use report::{BenchmarkReport, SpeedEntry};
pub use run::{Direction, Event, ProgressFn, Runner, run};
pub use series::MeasurementSeries;
pub use trials::{TrialOutcome, run_trials, run_trials_observed};

pub use speedr_http::{TimedClient, TimedTransaction, TransactionRequest};
pub use speedr_stats::Summary;
