//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Redemption (attempts by outcome, latency)
//! - Issuance (recycling, provisioning, pool exhaustion)
//! - Scanner gate (suppressed frames)
//! - Feed (snapshot emissions)

use once_cell::sync::Lazy;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};

// =============================================================================
// Redemption
// =============================================================================

/// Redemption attempts total by result.
pub static REDEMPTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tornello_redemptions_total", "Total redemption attempts"),
        &["result"], // "redeemed", "already_used", "not_active", "not_found", "store_unavailable"
    )
    .unwrap()
});

/// Redemption latency in seconds.
pub static REDEMPTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tornello_redemption_duration_seconds",
            "Duration of redemption attempts",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Issuance
// =============================================================================

/// Issuance attempts total by result.
pub static ISSUANCE: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tornello_issuance_total", "Total issuance attempts"),
        &["result"], // "recycled", "provisioned", "pool_exhausted"
    )
    .unwrap()
});

// =============================================================================
// Scanner gate
// =============================================================================

/// Decoded frames dropped by the per-device gate.
pub static SCANS_SUPPRESSED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tornello_scans_suppressed_total",
        "Decoded frames suppressed by the scanner gate",
    )
    .unwrap()
});

// =============================================================================
// Feed
// =============================================================================

/// Feed snapshot emissions total.
pub static FEED_EMISSIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tornello_feed_emissions_total",
        "Snapshot emissions delivered to feed subscribers",
    )
    .unwrap()
});

/// Register all core metrics on `registry`.
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(REDEMPTIONS.clone()))?;
    registry.register(Box::new(REDEMPTION_DURATION.clone()))?;
    registry.register(Box::new(ISSUANCE.clone()))?;
    registry.register(Box::new(SCANS_SUPPRESSED.clone()))?;
    registry.register(Box::new(FEED_EMISSIONS.clone()))?;
    Ok(())
}
