//! WebSocket endpoint — one session per connected client from upgrade
//! through disconnect.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use pulse_core::ConnectionId;
use pulse_hub::session::SessionHandle;
use pulse_hub::{frames, ingest};

use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::server::AppState;

/// GET /ws — upgrade to a hub session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, addr, state))
}

/// Run a session for one connected client.
///
/// 1. Sends the welcome frame
/// 2. Dispatches incoming text/binary frames through ingest
/// 3. Forwards outbound messages via the send channel
/// 4. Sends periodic Ping frames and disconnects unresponsive clients
/// 5. Cleans up session and device state on disconnect
#[instrument(skip_all, fields(remote_addr = %addr))]
pub async fn run_ws_session(ws: WebSocket, addr: SocketAddr, state: AppState) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let connection_id = ConnectionId::new();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(state.config.channel_capacity);
    let session = Arc::new(SessionHandle::new(
        connection_id.clone(),
        Some(addr.to_string()),
        send_tx,
    ));

    let connection_start = std::time::Instant::now();
    info!(connection_id = %connection_id, "client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    state.sessions.add(Arc::clone(&session)).await;

    if let Ok(json) = serde_json::to_string(&frames::welcome()) {
        let _ = ws_tx.send(Message::Text(json.into())).await;
    }

    // Outbound forwarder with periodic ping frames.
    let ping_interval = Duration::from_secs(state.config.heartbeat_interval_secs);
    let pong_timeout = Duration::from_secs(state.config.heartbeat_timeout_secs);
    let outbound_session = Arc::clone(&session);
    let shutdown = state.shutdown.token();
    let outbound_shutdown = shutdown.clone();
    let outbound = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        // Skip the immediate first tick
        let _ = ping.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping.tick() => {
                    if !outbound_session.check_alive()
                        && outbound_session.last_pong_elapsed() > pong_timeout
                    {
                        warn!("client unresponsive for {pong_timeout:?}, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_session.closed() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                () = outbound_shutdown.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Inbound loop. Ends on client close, transport error, eviction or
    // shutdown.
    loop {
        let next = tokio::select! {
            next = ws_rx.next() => next,
            () = session.closed() => break,
            () = shutdown.cancelled() => break,
        };
        let Some(Ok(msg)) = next else { break };
        let text = match msg {
            Message::Text(ref t) => Some(t.to_string()),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => Some(s.to_owned()),
                Err(_) => {
                    debug!(len = data.len(), "received non-UTF8 binary frame");
                    None
                }
            },
            Message::Close(_) => {
                info!(connection_id = %connection_id, "client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                session.mark_alive();
                None
            }
        };

        let Some(text) = text else { continue };
        session.mark_alive();
        ingest::handle_frame(&state.hub, &state.sessions, &state.push, &session, &text).await;
    }

    // Clean up.
    info!(connection_id = %connection_id, "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS)
        .record(connection_start.elapsed().as_secs_f64());
    outbound.abort();
    let _ = state.sessions.remove(&connection_id).await;
    let _ = state.hub.mark_disconnected(&connection_id);
}
