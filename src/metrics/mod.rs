//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Ledger transaction submission
//! - Deposit awaiter polling
//! - RPC health

use crate::error::{BridgeError, BridgeResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::{error, info};

lazy_static! {
    // Transaction metrics
    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "solanoid_transactions_submitted_total",
        "Total transactions accepted by the ledger node",
        &["program"]
    ).expect("metric can be registered");

    pub static ref TX_FAILED: CounterVec = register_counter_vec!(
        "solanoid_transactions_failed_total",
        "Total transactions that failed to build, sign or submit",
        &["program", "reason"]
    ).expect("metric can be registered");

    pub static ref TX_BATCHES: CounterVec = register_counter_vec!(
        "solanoid_instruction_batches_total",
        "Total multi-instruction transactions packed",
        &["program"]
    ).expect("metric can be registered");

    pub static ref TX_LATENCY: HistogramVec = register_histogram_vec!(
        "solanoid_transaction_latency_seconds",
        "Time from blockhash fetch to submission",
        &["program"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).expect("metric can be registered");

    // Awaiter metrics
    pub static ref AWAITER_POLLS: CounterVec = register_counter_vec!(
        "solanoid_awaiter_polls_total",
        "Total deposit awaiter polls",
        &["awaiter"]
    ).expect("metric can be registered");

    pub static ref AWAITER_ERRORS: CounterVec = register_counter_vec!(
        "solanoid_awaiter_retrieval_errors_total",
        "Total failed deposit retrievals",
        &["awaiter"]
    ).expect("metric can be registered");

    pub static ref AWAITER_DELIVERIES: CounterVec = register_counter_vec!(
        "solanoid_awaiter_deliveries_total",
        "Total deposits matched and delivered",
        &["awaiter"]
    ).expect("metric can be registered");

    pub static ref AWAITERS_ACTIVE: GaugeVec = register_gauge_vec!(
        "solanoid_awaiters_active",
        "Deposit awaiters currently polling",
        &["awaiter"]
    ).expect("metric can be registered");

    // Health metrics
    pub static ref HEALTH_CHECK_SUCCESS: CounterVec = register_counter_vec!(
        "solanoid_health_check_success_total",
        "Total successful ledger RPC health checks",
        &[]
    ).expect("metric can be registered");

    pub static ref HEALTH_CHECK_FAILURE: CounterVec = register_counter_vec!(
        "solanoid_health_check_failure_total",
        "Total failed ledger RPC health checks",
        &[]
    ).expect("metric can be registered");
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> BridgeResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| BridgeError::Config(format!("Cannot bind metrics port {}: {}", self.port, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| BridgeError::Config(format!("Metrics server stopped: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    render().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

// Helper functions to record metrics

pub fn record_tx_submitted(program: &str) {
    TX_SUBMITTED.with_label_values(&[program]).inc();
}

pub fn record_tx_failed(program: &str, error: &BridgeError) {
    let reason = match error {
        BridgeError::Rpc { .. } | BridgeError::MalformedResponse { .. } => "rpc",
        BridgeError::Rejected(_) => "rejected",
        BridgeError::Signing(_) => "signing",
        BridgeError::TransactionTooLarge { .. } => "too_large",
        _ => "other",
    };
    TX_FAILED.with_label_values(&[program, reason]).inc();
}

pub fn record_batch(program: &str) {
    TX_BATCHES.with_label_values(&[program]).inc();
}

pub fn record_tx_latency(program: &str, latency_secs: f64) {
    TX_LATENCY.with_label_values(&[program]).observe(latency_secs);
}

pub fn record_awaiter_poll(awaiter: &str) {
    AWAITER_POLLS.with_label_values(&[awaiter]).inc();
}

pub fn record_awaiter_error(awaiter: &str) {
    AWAITER_ERRORS.with_label_values(&[awaiter]).inc();
}

pub fn record_awaiter_delivery(awaiter: &str) {
    AWAITER_DELIVERIES.with_label_values(&[awaiter]).inc();
}

pub fn record_awaiter_started(awaiter: &str) {
    AWAITERS_ACTIVE.with_label_values(&[awaiter]).inc();
}

pub fn record_awaiter_stopped(awaiter: &str) {
    AWAITERS_ACTIVE.with_label_values(&[awaiter]).dec();
}

pub fn record_health_check() {
    HEALTH_CHECK_SUCCESS.with_label_values(&[]).inc();
}

pub fn record_health_check_failure() {
    HEALTH_CHECK_FAILURE.with_label_values(&[]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_rendered_output() {
        record_awaiter_poll("metrics-test");
        record_tx_failed("metrics-test", &BridgeError::Rejected("0x1".into()));

        let text = render().unwrap();
        assert!(text.contains("solanoid_awaiter_polls_total"));
        assert!(text.contains("reason=\"rejected\""));
    }
}
