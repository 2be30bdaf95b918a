//! `PulseServer` — Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pulse_hub::push::{NoopGateway, PushGateway};
use pulse_hub::{Hub, SessionTable};

use crate::api;
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::push::HttpPushGateway;
use crate::shutdown::ShutdownCoordinator;
use crate::ws;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Device registry, sample store and threshold state.
    pub hub: Arc<Hub>,
    /// Live connections for fan-out.
    pub sessions: Arc<SessionTable>,
    /// Push delivery backend.
    pub push: Arc<dyn PushGateway>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus render handle, when the recorder is installed.
    pub metrics_handle: Option<PrometheusHandle>,
}

/// The telemetry hub server.
pub struct PulseServer {
    config: Arc<ServerConfig>,
    hub: Arc<Hub>,
    sessions: Arc<SessionTable>,
    push: Arc<dyn PushGateway>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics_handle: Option<PrometheusHandle>,
}

impl PulseServer {
    /// Create a new server. Push delivery is enabled only when the config
    /// carries both an endpoint and a server key.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let push: Arc<dyn PushGateway> = match HttpPushGateway::from_config(&config.push) {
            Some(gateway) => {
                tracing::info!("push delivery enabled");
                Arc::new(gateway)
            }
            None => {
                tracing::info!("push delivery not configured, alerts go to sockets only");
                Arc::new(NoopGateway)
            }
        };
        Self {
            config: Arc::new(config),
            hub: Arc::new(Hub::new()),
            sessions: Arc::new(SessionTable::new()),
            push,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics_handle: None,
        }
    }

    /// Attach the Prometheus render handle for the `/metrics` endpoint.
    #[must_use]
    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: Arc::clone(&self.hub),
            sessions: Arc::clone(&self.sessions),
            push: Arc::clone(&self.push),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::clone(&self.config),
            start_time: self.start_time,
            metrics_handle: self.metrics_handle.clone(),
        };

        Router::new()
            .route("/ws", get(ws::ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/api/devices", get(api::list_devices))
            .route("/api/devices/{id}/data", get(api::device_data))
            .route("/api/devices/{id}/history", get(api::device_history))
            .route("/api/data", get(api::all_data))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the join
    /// handle of the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
        let bind = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .with_context(|| format!("failed to bind {bind}"))?;
        let addr = listener.local_addr().context("failed to read bound address")?;

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(err) = serve.await {
                tracing::error!(error = %err, "server error");
            }
        });

        tracing::info!(%addr, "listening");
        Ok((addr, handle))
    }

    /// The hub coordinator.
    #[must_use]
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// The session table.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }

    /// The shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.sessions.connection_count();
    let devices = state.hub.device_count();
    Json(health::health_check(state.start_time, connections, devices))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> (StatusCode, String) {
    match state.metrics_handle {
        Some(handle) => (StatusCode::OK, crate::metrics::render(&handle)),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}
