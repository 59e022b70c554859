//! Progress indicator for pipeline runs.
//!
//! A thin wrapper over `indicatif` with a single bar style. The bar is hidden
//! when progress is disabled (`--no-progress`, the `HELMVALS_NO_PROGRESS`
//! environment variable, or a non-interactive stderr), so library code can
//! call it unconditionally.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::io::IsTerminal;

/// Environment variable that disables progress output when set.
pub const NO_PROGRESS_ENV: &str = "HELMVALS_NO_PROGRESS";

/// Returns `true` when progress output should be suppressed.
#[must_use]
pub fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some() || !std::io::stderr().is_terminal()
}

/// A chart-count progress bar.
///
/// Cloning shares the underlying bar, so clones can be moved into concurrent
/// tasks.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a bar for `len` charts, hidden when `enabled` is false or progress
    /// is globally disabled.
    pub fn new(len: u64, enabled: bool) -> Self {
        let bar = if !enabled || is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(len);
            bar.set_style(default_style());
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// Creates a bar that never draws.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Sets the message shown after the bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Advances the bar.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Current position.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Removes the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}
