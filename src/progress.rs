//! Progress bars and phase logging for the binaries.
//!
//! The library core never reports progress. The binaries wrap each phase
//! (load, compare, dedup, export) in a spinner or bar, or in log-only mode
//! emit tracing lines instead so output stays readable under `tail -f`.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Hide bars and log phase lines instead (set from the CLI)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// "850ms", "4.2s", "3.5m"
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

fn hidden_or(pb: ProgressBar, style: ProgressStyle) -> ProgressBar {
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(style);
    }
    pb
}

/// Bar over a known number of steps (libraries loaded, pairs compared).
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let pb = hidden_or(ProgressBar::new(len), style);
    pb.set_message(msg.to_string());
    pb
}

/// Spinner for a single opaque phase such as one library comparison.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .template("{msg} {spinner} [{elapsed_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = hidden_or(ProgressBar::new_spinner(), style);
    if !is_log_only() {
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Log a step of a counted phase in log-only mode, every `interval` steps and at the end.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if is_log_only() && total > 0 && (current % interval.max(1) == 0 || current == total) {
        let pct = 100.0 * current as f64 / total as f64;
        info!(phase, current, total, "{:.1}%", pct);
    }
}

/// Timer for one named phase; logs its elapsed time when finished.
pub struct Phase {
    name: &'static str,
    started: Instant,
    bar: ProgressBar,
}

impl Phase {
    pub fn spinner(name: &'static str, msg: &str) -> Self {
        Self {
            name,
            started: Instant::now(),
            bar: create_spinner(msg),
        }
    }

    pub fn counted(name: &'static str, len: u64, msg: &str) -> Self {
        Self {
            name,
            started: Instant::now(),
            bar: create_progress_bar(len, msg),
        }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    pub fn inc(&self) {
        self.bar.inc(1);
        log_progress(self.name, self.bar.position(), self.bar.length().unwrap_or(0), 10);
    }

    /// Clear the bar and log the elapsed time. Returns it for summaries.
    pub fn finish(self, detail: &str) -> Duration {
        let elapsed = self.started.elapsed();
        self.bar.finish_and_clear();
        info!(phase = self.name, elapsed = %format_duration(elapsed), "{}", detail);
        elapsed
    }
}
