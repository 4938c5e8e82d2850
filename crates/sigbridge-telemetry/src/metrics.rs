//! Prometheus metrics for sigbridge.
//!
//! Covers the whole signal path:
//! - webhook requests and received signals
//! - reconciliation outcomes
//! - order submissions and exchange call latency
//! - position queries that fell back to FLAT
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which is a programming error surfaced on first access.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Webhook requests by response status.
pub static WEBHOOK_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigbridge_webhook_requests_total",
        "Total webhook requests by HTTP status",
        &["status"]
    )
    .unwrap()
});

/// Signals accepted by the webhook.
/// Labels: signal (BUY/SELL/unrecognized)
pub static SIGNALS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigbridge_signals_total",
        "Total trading signals received",
        &["signal"]
    )
    .unwrap()
});

/// Orders submitted to the exchange.
/// Labels: kind (open/close), result (ok/error)
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigbridge_orders_total",
        "Total orders submitted to the exchange",
        &["kind", "result"]
    )
    .unwrap()
});

/// Reconciliation outcomes.
/// Labels: outcome (completed/noop/aborted/rejected)
pub static RECONCILE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigbridge_reconcile_total",
        "Total reconciliations by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Exchange call latency in milliseconds.
pub static GATEWAY_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "sigbridge_gateway_latency_ms",
        "Exchange call latency in milliseconds",
        &["op"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Position queries that failed and were treated as FLAT.
pub static POSITION_QUERY_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sigbridge_position_query_failures_total",
        "Total position queries that failed",
        &["symbol"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a webhook response.
    pub fn webhook_request(status: u16) {
        let status = status.to_string();
        WEBHOOK_REQUESTS_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();
    }

    /// Record a received signal.
    pub fn signal_received(signal: &str) {
        SIGNALS_TOTAL.with_label_values(&[signal]).inc();
    }

    /// Record an order submission.
    pub fn order_submitted(kind: &str, result: &str) {
        ORDERS_TOTAL.with_label_values(&[kind, result]).inc();
    }

    /// Record the outcome of one reconciliation.
    pub fn reconcile_outcome(outcome: &str) {
        RECONCILE_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record exchange call latency.
    pub fn gateway_latency(op: &str, latency_ms: f64) {
        GATEWAY_LATENCY_MS
            .with_label_values(&[op])
            .observe(latency_ms);
    }

    /// Record a failed position query.
    pub fn position_query_failed(symbol: &str) {
        POSITION_QUERY_FAILURES_TOTAL
            .with_label_values(&[symbol])
            .inc();
    }
}

/// Render every registered metric in the Prometheus text format.
pub fn render_metrics() -> TelemetryResult<String> {
    // Families only register on first access.
    Lazy::force(&WEBHOOK_REQUESTS_TOTAL);
    Lazy::force(&SIGNALS_TOTAL);
    Lazy::force(&ORDERS_TOTAL);
    Lazy::force(&RECONCILE_TOTAL);
    Lazy::force(&GATEWAY_LATENCY_MS);
    Lazy::force(&POSITION_QUERY_FAILURES_TOTAL);

    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buf)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
}
