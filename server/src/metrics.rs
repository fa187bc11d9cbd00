//! # Prometheus Metrics
//!
//! Listing counters and latency, scraped from `/metrics` on the metrics
//! port. [`MetricsDiagnostics`] is the diagnostic sink the server hands to
//! the explorer: it counts degraded items, stale address reads and scope
//! failures, then forwards each event to the tracing sink.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use chainsight_explorer::diagnostics::{DegradeReason, DiagnosticSink, TracingDiagnostics};
use chainsight_explorer::error::{IndexError, ListingError};
use chainsight_explorer::types::ScopeKind;

/// Metric handles for the server, all owned by one registry.
#[derive(Clone)]
pub struct ServerMetrics {
    registry: Registry,
    /// Listing requests by scope (`range`, `block`, `address`, `empty`).
    pub listing_requests_total: IntCounterVec,
    /// Listing requests that failed at scope level, by scope.
    pub scope_failures_total: IntCounterVec,
    /// Transactions returned as `{txid}` stubs.
    pub degraded_items_total: IntCounter,
    /// Address listings served from a stale aggregate.
    pub stale_address_reads_total: IntCounter,
    /// Best indexed block height, as of the last `/status` call.
    pub tip_height: IntGauge,
    /// Wall time of listing requests.
    pub listing_latency_seconds: Histogram,
}

impl ServerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("chainsight".into()), None)?;

        let listing_requests_total = IntCounterVec::new(
            Opts::new("listing_requests_total", "Transaction listing requests by scope"),
            &["scope"],
        )?;
        registry.register(Box::new(listing_requests_total.clone()))?;

        let scope_failures_total = IntCounterVec::new(
            Opts::new(
                "scope_failures_total",
                "Listing requests that failed resolving their scope",
            ),
            &["scope"],
        )?;
        registry.register(Box::new(scope_failures_total.clone()))?;

        let degraded_items_total = IntCounter::new(
            "degraded_items_total",
            "Transactions returned as id-only stubs",
        )?;
        registry.register(Box::new(degraded_items_total.clone()))?;

        let stale_address_reads_total = IntCounter::new(
            "stale_address_reads_total",
            "Address listings served from a stale aggregate after a failed refresh",
        )?;
        registry.register(Box::new(stale_address_reads_total.clone()))?;

        let tip_height = IntGauge::new("tip_height", "Height of the best indexed block")?;
        registry.register(Box::new(tip_height.clone()))?;

        let listing_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "listing_latency_seconds",
                "Transaction listing request latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(listing_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            listing_requests_total,
            scope_failures_total,
            degraded_items_total,
            stale_address_reads_total,
            tip_height,
            listing_latency_seconds,
        })
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<ServerMetrics>;

/// `GET /metrics`.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
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

// ---------------------------------------------------------------------------
// Diagnostic sink
// ---------------------------------------------------------------------------

/// Counts explorer diagnostics and forwards them to [`TracingDiagnostics`].
pub struct MetricsDiagnostics {
    metrics: SharedMetrics,
    log: TracingDiagnostics,
}

impl MetricsDiagnostics {
    pub fn new(metrics: SharedMetrics) -> Self {
        Self {
            metrics,
            log: TracingDiagnostics,
        }
    }
}

impl DiagnosticSink for MetricsDiagnostics {
    fn item_degraded(&self, txid: &str, reason: &DegradeReason) {
        self.metrics.degraded_items_total.inc();
        self.log.item_degraded(txid, reason);
    }

    fn stale_aggregate_used(&self, address: &str, error: &IndexError) {
        self.metrics.stale_address_reads_total.inc();
        self.log.stale_aggregate_used(address, error);
    }

    fn scope_failed(&self, scope: ScopeKind, error: &ListingError) {
        self.metrics
            .scope_failures_total
            .with_label_values(&[scope.as_str()])
            .inc();
        self.log.scope_failed(scope, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_encodes_with_prefix() {
        let metrics = ServerMetrics::new().unwrap();
        metrics
            .listing_requests_total
            .with_label_values(&["block"])
            .inc();
        let text = metrics.encode().unwrap();
        assert!(text.contains("chainsight_listing_requests_total{scope=\"block\"} 1"));
        assert!(text.contains("chainsight_degraded_items_total 0"));
    }

    #[test]
    fn diagnostics_increment_counters() {
        let metrics = Arc::new(ServerMetrics::new().unwrap());
        let sink = MetricsDiagnostics::new(metrics.clone());

        sink.item_degraded("aa", &DegradeReason::NotFound);
        sink.item_degraded("bb", &DegradeReason::LookupFailed("timeout".into()));
        sink.stale_aggregate_used("1abc", &IndexError::Unavailable("down".into()));
        sink.scope_failed(
            ScopeKind::Range,
            &ListingError::UnresolvedHeight { height: 9 },
        );

        assert_eq!(metrics.degraded_items_total.get(), 2);
        assert_eq!(metrics.stale_address_reads_total.get(), 1);
        assert_eq!(
            metrics
                .scope_failures_total
                .with_label_values(&["range"])
                .get(),
            1
        );
    }
}
