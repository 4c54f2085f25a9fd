use serde::{Deserialize, Serialize};
use std::io::Write as _;

use super::OutputFormatter;
use super::human::format::format_fixed;

/// Silent while running; one pretty-printed document at the end.
pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _cfg: &speedr_core::RunConfig) {}

    fn progress(&self) -> Option<speedr_core::ProgressFn> {
        None
    }

    fn print_summary(&self, report: &speedr_core::BenchmarkReport) -> anyhow::Result<()> {
        let doc = build_report(report);
        let mut out = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &doc)?;
        writeln!(out)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct JsonReport {
    pub server_location: String,
    pub your_ip: String,
    pub latency: JsonLatency,
    pub download_speeds: Vec<JsonSpeed>,
    pub upload_speeds: Vec<JsonSpeed>,
}

/// Milliseconds, two decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct JsonLatency {
    pub min: String,
    pub max: String,
    pub average: String,
    pub median: String,
    pub jitter: String,
}

/// Megabits per second, two decimals. `size` is a tier label or `overall`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct JsonSpeed {
    pub size: String,
    pub speed: String,
}

const OVERALL: &str = "overall";

pub(crate) fn build_report(report: &speedr_core::BenchmarkReport) -> JsonReport {
    let l = &report.latency;
    JsonReport {
        server_location: report.server_location.clone(),
        your_ip: report.your_ip.clone(),
        latency: JsonLatency {
            min: format_fixed(l.min),
            max: format_fixed(l.max),
            average: format_fixed(l.average),
            median: format_fixed(l.median),
            jitter: format_fixed(l.jitter),
        },
        download_speeds: speeds(&report.download, report.download_overall),
        upload_speeds: speeds(&report.upload, report.upload_overall),
    }
}

fn speeds(entries: &[speedr_core::SpeedEntry], overall: f64) -> Vec<JsonSpeed> {
    entries
        .iter()
        .map(|e| JsonSpeed {
            size: e.size.clone(),
            speed: format_fixed(e.speed_mbps),
        })
        .chain(std::iter::once(JsonSpeed {
            size: OVERALL.to_string(),
            speed: format_fixed(overall),
        }))
        .collect()
}
