//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Searches (outcome, duration)
//! - Fallback tiers taken by each cascade stage
//! - Collaborator failures (LMS, classifier, image describer)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Searches
// =============================================================================

/// Searches total by outcome.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("hivemind_searches_total", "Total resource searches"),
        &["outcome"], // "found", "no_courses", "no_modules", "no_resources"
    )
    .unwrap()
});

/// End-to-end search duration in seconds.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "hivemind_search_duration_seconds",
            "Duration of a full cascade run",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Cascade
// =============================================================================

/// Fallback tiers taken, by stage.
pub static FALLBACKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "hivemind_fallbacks_total",
            "Times a stage fell back to a heuristic tier",
        ),
        &["stage"], // "course", "modules", "resources"
    )
    .unwrap()
});

/// Collaborator calls that failed or timed out.
pub static COLLABORATOR_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "hivemind_collaborator_failures_total",
            "Failed or timed out collaborator calls",
        ),
        &["collaborator"], // "lms", "classifier", "describer"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SEARCH_DURATION.clone()),
        Box::new(FALLBACKS_TOTAL.clone()),
        Box::new(COLLABORATOR_FAILURES.clone()),
    ]
}
