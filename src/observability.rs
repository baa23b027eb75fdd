use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "lido_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "lido_query_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "lido_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "lido_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "lido_connections_rejected_total";

// ── Domain ──────────────────────────────────────────────────────

/// Counter: reservations stored.
pub const RESERVATIONS_CREATED_TOTAL: &str = "lido_reservations_created_total";

/// Counter: creation requests refused. Labels: reason.
pub const RESERVATIONS_REJECTED_TOTAL: &str = "lido_reservations_rejected_total";

/// Counter: reservations deleted.
pub const RESERVATIONS_DELETED_TOTAL: &str = "lido_reservations_deleted_total";

/// Gauge: reservations currently held.
pub const RESERVATIONS_ACTIVE: &str = "lido_reservations_active";

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

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertReservation(_) => "insert_reservation",
        Command::SelectReservations => "select_reservations",
        Command::SelectReservation { .. } => "select_reservation",
        Command::DeleteReservation { .. } => "delete_reservation",
        Command::SelectFreeUmbrellas { .. } => "select_free_umbrellas",
    }
}
