//! Progress reporting for the non-interactive audit.
//!
//! Interactive sessions never draw progress bars, since they would fight
//! the prompts for the terminal. In log-only mode bars are hidden and
//! periodic lines go to stderr instead.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global flag for log-only mode (set from args in main)
static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Set log-only mode globally
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

/// Check if log-only mode is enabled
pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format an elapsed time as seconds, or minutes past one minute
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Bar over the species being audited, or a hidden one in log-only mode.
pub fn species_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} species")
                .unwrap()
                .progress_chars("=> "),
        );
    }
    pb.set_message("Auditing labels");
    pb
}

/// Every `interval` species (and at the end), log a line when bars are hidden.
pub fn log_species_progress(current: u64, total: u64, interval: u64) {
    if is_log_only() && total > 0 && (current % interval == 0 || current == total) {
        let pct = 100.0 * current as f64 / total as f64;
        eprintln!("[audit] {}/{} species ({:.1}%)", current, total, pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }
}
