//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
#[must_use]
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Connection-level metric names; the hub-side names live in
// pulse_hub::counters next to the code that records them.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "pulse_ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "pulse_ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "pulse_ws_connections_active";
/// Connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "pulse_ws_connection_duration_seconds";

pub use pulse_hub::counters::{
    BROADCAST_DROPS_TOTAL, CRITICAL_ALERTS_TOTAL, DEVICES_REGISTERED_TOTAL, INGEST_FRAMES_TOTAL,
    INGEST_PROTOCOL_ERRORS_TOTAL, PUSH_FAILURES_TOTAL, PUSH_SENDS_TOTAL,
};
