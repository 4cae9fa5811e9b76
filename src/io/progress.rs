//! Spinner shown while the ensemble runs

use crate::io::configuration::SPINNER_TICK_MS;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::LazyLock;
use std::time::Duration;

static SPINNER_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
});

/// Elapsed-time spinner for the blocking inference call
pub struct InferenceProgress {
    spinner: ProgressBar,
}

impl Default for InferenceProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceProgress {
    /// Create a spinner that is not yet ticking
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(SPINNER_STYLE.clone());
        Self { spinner }
    }

    /// Start ticking with a message naming the case
    pub fn start(&self, case_id: &str) {
        self.spinner
            .set_message(format!("Segmenting {case_id} with the DeepISLES ensemble"));
        self.spinner
            .enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    }

    /// Stop ticking and remove the spinner from the terminal
    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}
