use speedr_stats::Summary;

use crate::UNKNOWN_LABEL;

/// Representative speed of one tier.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedEntry {
    pub size: String,
    /// Median of the tier's series; NaN when every trial failed.
    pub speed_mbps: f64,
    /// Trials that produced a measurement.
    pub samples: usize,
}

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    pub server_location: String,
    pub your_ip: String,
    pub latency: Summary,
    pub download: Vec<SpeedEntry>,
    pub download_overall: f64,
    pub upload: Vec<SpeedEntry>,
    pub upload_overall: f64,
}

/// Report under construction, filled in as the run progresses.
#[derive(Debug, Clone)]
pub(crate) struct ReportDraft {
    pub(crate) server_location: String,
    pub(crate) your_ip: String,
    pub(crate) latency: Summary,
    pub(crate) download: Vec<SpeedEntry>,
    pub(crate) download_overall: f64,
    pub(crate) upload: Vec<SpeedEntry>,
    pub(crate) upload_overall: f64,
}

impl Default for ReportDraft {
    fn default() -> Self {
        Self {
            server_location: UNKNOWN_LABEL.to_string(),
            your_ip: UNKNOWN_LABEL.to_string(),
            latency: Summary::of(&[]),
            download: Vec::new(),
            download_overall: f64::NAN,
            upload: Vec::new(),
            upload_overall: f64::NAN,
        }
    }
}

impl ReportDraft {
    pub(crate) fn finish(self) -> BenchmarkReport {
        BenchmarkReport {
            server_location: self.server_location,
            your_ip: self.your_ip,
            latency: self.latency,
            download: self.download,
            download_overall: self.download_overall,
            upload: self.upload,
            upload_overall: self.upload_overall,
        }
    }
}
