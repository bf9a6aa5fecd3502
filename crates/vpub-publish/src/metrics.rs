//! Publish metrics collection.
//!
//! - Attempt counters by outcome
//! - Attempt latency histogram
//! - Workspace cleanup failures

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total publish attempts by outcome (`live` or an error kind).
    pub const ATTEMPTS_TOTAL: &str = "vpub_publish_attempts_total";

    /// Publish attempt latency in seconds by outcome.
    pub const DURATION_SECONDS: &str = "vpub_publish_duration_seconds";

    /// Workspaces that could not be removed.
    pub const CLEANUP_FAILURES_TOTAL: &str = "vpub_workspace_cleanup_failures_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record a finished publish attempt.
pub fn record_attempt(outcome: &str, duration_secs: f64) {
    counter!(
        names::ATTEMPTS_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        names::DURATION_SECONDS,
        "outcome" => outcome.to_string()
    )
    .record(duration_secs);
}

pub fn record_cleanup_failure() {
    counter!(names::CLEANUP_FAILURES_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::ATTEMPTS_TOTAL.starts_with("vpub_publish"));
        assert!(names::DURATION_SECONDS.ends_with("_seconds"));
    }
}
