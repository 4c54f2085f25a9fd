use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One trial bar at a time, drawn on stderr.
pub(crate) struct HumanProgress {
    inner: Mutex<Option<ProgressBar>>,
}

impl HumanProgress {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub(crate) fn start(&self, prefix: &str, trials: u32) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(old) = inner.take() {
            old.finish_and_clear();
        }

        let pb = ProgressBar::with_draw_target(
            Some(u64::from(trials)),
            ProgressDrawTarget::stderr_with_hz(5),
        );
        pb.set_style(bar_style());
        pb.set_prefix(prefix.to_string());
        *inner = Some(pb);
    }

    pub(crate) fn trial_done(&self, failed: bool) {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(pb) = inner.as_ref() {
            if failed {
                pb.set_message("(failed trials excluded)");
            }
            pb.inc(1);
        }
    }

    /// Print a result line on stdout without tearing the bar.
    pub(crate) fn println(&self, line: &str) {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match inner.as_ref() {
            Some(pb) => pb.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    pub(crate) fn finish(&self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(pb) = inner.take() {
            pb.finish_and_clear();
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>20} [ {bar:20.cyan/blue} ] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}
