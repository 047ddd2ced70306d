//! # Prometheus Metrics
//!
//! Exposes operational metrics for the access gateway. Scraped by
//! Prometheus at the `/metrics` HTTP endpoint on the configured metrics
//! port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the gateway.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it can
/// be shared across request handlers and background tasks.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total `initiate` requests received, any outcome.
    pub initiate_requests_total: IntCounter,
    /// Total `verify` requests received, any outcome.
    pub verify_requests_total: IntCounter,
    /// Total access grants issued.
    pub grants_issued_total: IntCounter,
    /// Total denied requests across both phases.
    pub denials_total: IntCounter,
    /// Challenges currently pending in the registry.
    pub challenges_pending: IntGauge,
    /// Total expired challenges reclaimed by the sweeper.
    pub challenges_swept_total: IntCounter,
    /// Histogram of `verify` handling latency in seconds.
    pub verify_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("ledgerbound".into()), None)
            .expect("failed to create prometheus registry");

        let initiate_requests_total = IntCounter::new(
            "initiate_requests_total",
            "Total initiate requests received",
        )
        .expect("metric creation");
        registry
            .register(Box::new(initiate_requests_total.clone()))
            .expect("metric registration");

        let verify_requests_total =
            IntCounter::new("verify_requests_total", "Total verify requests received")
                .expect("metric creation");
        registry
            .register(Box::new(verify_requests_total.clone()))
            .expect("metric registration");

        let grants_issued_total =
            IntCounter::new("grants_issued_total", "Total access grants issued")
                .expect("metric creation");
        registry
            .register(Box::new(grants_issued_total.clone()))
            .expect("metric registration");

        let denials_total = IntCounter::new(
            "denials_total",
            "Total denied requests across both handshake phases",
        )
        .expect("metric creation");
        registry
            .register(Box::new(denials_total.clone()))
            .expect("metric registration");

        let challenges_pending = IntGauge::new(
            "challenges_pending",
            "Challenges currently pending in the registry",
        )
        .expect("metric creation");
        registry
            .register(Box::new(challenges_pending.clone()))
            .expect("metric registration");

        let challenges_swept_total = IntCounter::new(
            "challenges_swept_total",
            "Total expired challenges reclaimed by the sweeper",
        )
        .expect("metric creation");
        registry
            .register(Box::new(challenges_swept_total.clone()))
            .expect("metric registration");

        let verify_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "verify_latency_seconds",
                "End-to-end verify handling latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(verify_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            initiate_requests_total,
            verify_requests_total,
            grants_issued_total,
            denials_total,
            challenges_pending,
            challenges_swept_total,
            verify_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers via extension.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_the_exposition() {
        let metrics = NodeMetrics::new();
        metrics.initiate_requests_total.inc();
        metrics.grants_issued_total.inc_by(3);
        metrics.challenges_pending.set(7);

        let body = metrics.encode().unwrap();
        assert!(body.contains("ledgerbound_initiate_requests_total 1"));
        assert!(body.contains("ledgerbound_grants_issued_total 3"));
        assert!(body.contains("ledgerbound_challenges_pending 7"));
    }
}
