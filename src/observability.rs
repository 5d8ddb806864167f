use std::net::SocketAddr;

use crate::engine::{Created, EngineError};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: recurring requests submitted. Labels: mode, outcome.
pub const REQUESTS_TOTAL: &str = "recurra_requests_total";

/// Histogram: submit latency in seconds, expansion through commit.
pub const SUBMIT_DURATION_SECONDS: &str = "recurra_submit_duration_seconds";

/// Counter: reservations committed.
pub const RESERVATIONS_CREATED_TOTAL: &str = "recurra_reservations_created_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "recurra_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (records per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "recurra_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a submit result to a short label for metrics.
pub fn outcome_label(result: &Result<Created, EngineError>) -> &'static str {
    match result {
        Ok(_) => "created",
        Err(EngineError::Conflict { .. }) => "conflict",
        Err(EngineError::NoReservationCreated) => "no_op",
        Err(EngineError::Internal(_)) => "internal",
        Err(
            EngineError::MalformedTimeOfDay(_)
            | EngineError::InvalidRequest(_)
            | EngineError::LimitExceeded(_),
        ) => "invalid",
    }
}
