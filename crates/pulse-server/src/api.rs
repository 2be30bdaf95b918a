//! REST query surface.
//!
//! Read-only views over the hub; no route mutates state. Unknown device
//! ids answer 404, a registered device with no samples answers 200 with a
//! placeholder body so dashboards can distinguish the two.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use pulse_core::{DeviceId, DeviceInfo};

use crate::server::AppState;

/// Default history slice when the query gives no limit.
const DEFAULT_HISTORY_LIMIT: usize = 100;

/// GET /api/devices
pub async fn list_devices(State(state): State<AppState>) -> Json<serde_json::Value> {
    let devices: Vec<DeviceInfo> = state.hub.list_devices().iter().map(DeviceInfo::from).collect();
    Json(json!({
        "count": devices.len(),
        "devices": devices,
    }))
}

/// GET /api/devices/{id}/data
pub async fn device_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let device_id = DeviceId::from(id);
    if !state.hub.device_known(&device_id) {
        return not_found(&device_id);
    }
    match state.hub.latest(&device_id) {
        Some(sample) => Json(sample).into_response(),
        None => Json(json!({ "message": "No data available" })).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
}

/// GET /api/devices/{id}/history?limit=N
pub async fn device_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let device_id = DeviceId::from(id);
    if !state.hub.device_known(&device_id) {
        return not_found(&device_id);
    }
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let data = state.hub.history_slice(&device_id, limit);
    Json(json!({
        "deviceId": device_id,
        "count": data.len(),
        "data": data,
    }))
    .into_response()
}

/// GET /api/data
pub async fn all_data(State(state): State<AppState>) -> Json<serde_json::Value> {
    let data = state.hub.all_latest();
    Json(json!({
        "timestamp": Utc::now().to_rfc3339(),
        "devices": state.hub.device_count(),
        "data": data,
    }))
}

fn not_found(device_id: &DeviceId) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("device '{device_id}' not found") })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use crate::config::ServerConfig;
    use crate::server::PulseServer;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pulse_core::ConnectionId;
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    fn metrics(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn make_server() -> PulseServer {
        PulseServer::new(ServerConfig::default())
    }

    #[tokio::test]
    async fn devices_empty_registry() {
        let server = make_server();
        let (status, body) = get(server.router(), "/api/devices").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert_eq!(body["devices"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn devices_lists_registered() {
        let server = make_server();
        let conn = ConnectionId::from("c1");
        let _ = server
            .hub()
            .record_sample("press_01".into(), metrics(&[("temperature", 22.0)]), &conn, None);

        let (status, body) = get(server.router(), "/api/devices").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["devices"][0]["deviceId"], "press_01");
        assert_eq!(body["devices"][0]["connected"], true);
        assert_eq!(body["devices"][0]["type"], "unknown");
    }

    #[tokio::test]
    async fn device_data_unknown_is_404() {
        let server = make_server();
        let (status, body) = get(server.router(), "/api/devices/ghost/data").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn device_data_registered_without_samples() {
        let server = make_server();
        let _ = server.hub().register(
            pulse_hub::registry::Registration {
                device_id: Some("d1".into()),
                name: None,
                device_type: None,
            },
            &"c1".into(),
            None,
        );
        let (status, body) = get(server.router(), "/api/devices/d1/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "No data available");
    }

    #[tokio::test]
    async fn device_data_returns_latest_sample() {
        let server = make_server();
        let conn = ConnectionId::from("c1");
        let _ = server
            .hub()
            .record_sample("d1".into(), metrics(&[("temperature", 20.0)]), &conn, None);
        let _ = server
            .hub()
            .record_sample("d1".into(), metrics(&[("temperature", 23.5)]), &conn, None);

        let (status, body) = get(server.router(), "/api/devices/d1/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deviceId"], "d1");
        assert_eq!(body["metrics"]["temperature"], 23.5);
        assert!(body["receivedAt"].is_string());
    }

    #[tokio::test]
    async fn history_newest_first_with_limit() {
        let server = make_server();
        let conn = ConnectionId::from("c1");
        for i in 0..5 {
            let _ = server.hub().record_sample(
                "d1".into(),
                metrics(&[("temperature", f64::from(i))]),
                &conn,
                None,
            );
        }

        let (status, body) = get(server.router(), "/api/devices/d1/history?limit=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deviceId"], "d1");
        assert_eq!(body["count"], 3);
        assert_eq!(body["data"][0]["metrics"]["temperature"], 4.0);
        assert_eq!(body["data"][2]["metrics"]["temperature"], 2.0);
    }

    #[tokio::test]
    async fn history_unknown_device_is_404() {
        let server = make_server();
        let (status, _) = get(server.router(), "/api/devices/ghost/history").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn history_default_limit() {
        let server = make_server();
        let conn = ConnectionId::from("c1");
        for i in 0..150 {
            let _ = server.hub().record_sample(
                "d1".into(),
                metrics(&[("temperature", f64::from(i))]),
                &conn,
                None,
            );
        }
        let (_, body) = get(server.router(), "/api/devices/d1/history").await;
        assert_eq!(body["count"], 100, "default limit is 100");
    }

    #[tokio::test]
    async fn all_data_snapshot() {
        let server = make_server();
        let _ = server
            .hub()
            .record_sample("a".into(), metrics(&[("temperature", 1.0)]), &"c1".into(), None);
        let _ = server
            .hub()
            .record_sample("b".into(), metrics(&[("vibration", 2.0)]), &"c2".into(), None);

        let (status, body) = get(server.router(), "/api/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["devices"], 2);
        assert_eq!(body["data"]["a"]["metrics"]["temperature"], 1.0);
        assert_eq!(body["data"]["b"]["metrics"]["vibration"], 2.0);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn health_endpoint() {
        let server = make_server();
        let (status, body) = get(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connections"], 0);
        assert!(body["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let server = make_server();
        let resp = server
            .router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
