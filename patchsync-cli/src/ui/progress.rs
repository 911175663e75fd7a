//! Observers that render run events on the terminal and in the log.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use patchsync::SyncObserver;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>3}%  {msg}";

/// Progress bar driven by run events.
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    /// Create a bar spanning 0-100%.
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        let bar_style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(bar_style);
        bar.set_message("Starting...");
        Self { bar }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncObserver for ProgressObserver {
    fn on_progress(&mut self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_status(&mut self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn on_finished(&mut self, success: bool) {
        if success {
            self.bar
                .finish_with_message(style("Done.").green().to_string());
        } else {
            self.bar.abandon();
        }
    }
}

/// Writes run log lines through `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl SyncObserver for LogObserver {
    fn on_status(&mut self, text: &str) {
        debug!(status = text);
    }

    fn on_log(&mut self, text: &str) {
        info!("{}", text);
    }

    fn on_finished(&mut self, success: bool) {
        info!(success, "Run finished");
    }
}
