//! Spinners for long-running lookups.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Start a steady spinner with `message`. Finish it with `finish_and_clear`.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.magenta} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
