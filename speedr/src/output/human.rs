use std::sync::Arc;

pub(super) mod format;
mod progress;

use format::{format_line, format_mbps, format_ms};
use progress::HumanProgress;
use speedr_core::{Direction, Event};

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, cfg: &speedr_core::RunConfig) {
        tracing::debug!(
            base_url = %cfg.base_url,
            timeout = ?cfg.timeout,
            metric = %cfg.server_timing_metric,
            "starting speed test"
        );
    }

    fn progress(&self) -> Option<speedr_core::ProgressFn> {
        let progress = self.progress.clone();
        Some(Arc::new(move |event| {
            for line in render_event(&event) {
                progress.println(&line);
            }

            match event {
                Event::LatencyStarted { trials } => progress.start("latency", trials),
                Event::TierStarted { direction, tier } => {
                    progress.start(&format!("{direction} {}", tier.label), tier.trials);
                }
                Event::TrialFinished { outcome, .. } => {
                    progress.trial_done(outcome.value.is_none())
                }
                Event::Latency(_) | Event::TierFinished { .. } => progress.finish(),
                Event::Located { .. } | Event::Overall { .. } => {}
            }
        }))
    }

    fn print_summary(&self, _report: &speedr_core::BenchmarkReport) -> anyhow::Result<()> {
        // Every figure was already printed as it came in.
        self.progress.finish();
        Ok(())
    }
}

/// Console lines for one progress event.
fn render_event(event: &Event) -> Vec<String> {
    match event {
        Event::Located {
            server_location,
            your_ip,
        } => vec![
            format_line("Server location", server_location),
            format_line("Your IP", your_ip),
        ],
        Event::Latency(s) => {
            let range = format!("{} / {}", format_ms(s.min), format_ms(s.max));
            vec![
                format_line("Latency", &format_ms(s.median)),
                format_line("Jitter", &format_ms(s.jitter)),
                format_line("Latency (min/max)", &range),
                format_line("Latency (average)", &format_ms(s.average)),
            ]
        }
        Event::TierFinished { direction, entry } => vec![format_line(
            &format!("{} {direction}", entry.size),
            &format_mbps(entry.speed_mbps),
        )],
        Event::Overall {
            direction,
            speed_mbps,
        } => vec![format_line(
            &format!("{} speed", capitalized(*direction)),
            &format_mbps(*speed_mbps),
        )],
        Event::LatencyStarted { .. } | Event::TierStarted { .. } | Event::TrialFinished { .. } => {
            Vec::new()
        }
    }
}

fn capitalized(direction: Direction) -> &'static str {
    match direction {
        Direction::Download => "Download",
        Direction::Upload => "Upload",
    }
}
