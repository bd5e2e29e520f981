//! Guard metrics.
//!
//! # Metrics
//! - `backoff_guard_rejections_total` (counter): calls refused during a cooldown
//! - `backoff_guard_failures_total` (counter): operation failures that bumped a cooldown
//! - `backoff_guard_resets_total` (counter): successes that cleared a cooldown
//!
//! Updates go through the `metrics` facade and are no-ops until the host
//! installs a recorder.

use metrics::counter;

pub fn record_rejection() {
    counter!("backoff_guard_rejections_total").increment(1);
}

pub fn record_failure() {
    counter!("backoff_guard_failures_total").increment(1);
}

pub fn record_reset() {
    counter!("backoff_guard_resets_total").increment(1);
}
