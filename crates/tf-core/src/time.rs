//! Human-readable durations for run summaries and progress logs.

use std::time::Duration;

/// Render a duration as `1h 2m 3s`, `2m 3s`, or `3s`.
///
/// Sub-second remainders are truncated; use [`Duration::as_secs_f64`] when
/// precision matters.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
