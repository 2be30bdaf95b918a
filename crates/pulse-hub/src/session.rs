//! Per-connection session state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pulse_core::ConnectionId;

/// What a connection is, from the hub's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRole {
    /// A sensor-bearing device (the default for a new connection).
    Device,
    /// A dashboard/observer client that receives broadcasts.
    Observer,
}

/// One live bidirectional connection.
///
/// The handle owns a bounded send channel to the connection's writer task;
/// everything else about the socket stays in the server layer. Identity is
/// the [`ConnectionId`] — device records store that id, never the handle,
/// so superseded sessions are detected by comparing ids.
pub struct SessionHandle {
    /// Stable opaque identity of this connection.
    pub id: ConnectionId,
    /// Remote address, when known.
    pub remote_addr: Option<String>,
    /// Current role. Flips to observer on a `web_client` frame.
    role: Mutex<SessionRole>,
    /// External-notification token for observer sessions.
    notification_token: Mutex<Option<String>>,
    /// Send channel to the connection's writer task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has responded since the last heartbeat check.
    pub is_alive: AtomicBool,
    /// When the last pong (or any activity) was received.
    last_pong: Mutex<Instant>,
    /// Messages dropped because the send channel was full or closed.
    dropped_messages: AtomicU64,
    /// Set when the hub wants this connection torn down (eviction).
    cancel: CancellationToken,
}

impl SessionHandle {
    /// Create a handle for a freshly opened connection.
    #[must_use]
    pub fn new(id: ConnectionId, remote_addr: Option<String>, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            remote_addr,
            role: Mutex::new(SessionRole::Device),
            notification_token: Mutex::new(None),
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    /// Current role.
    #[must_use]
    pub fn role(&self) -> SessionRole {
        *self.role.lock()
    }

    /// Whether this session receives broadcasts.
    #[must_use]
    pub fn is_observer(&self) -> bool {
        self.role() == SessionRole::Observer
    }

    /// Mark this session as an observer, storing its notification token.
    pub fn mark_observer(&self, token: Option<String>) {
        *self.role.lock() = SessionRole::Observer;
        *self.notification_token.lock() = token;
    }

    /// The observer's external-notification token, if it supplied one.
    #[must_use]
    pub fn notification_token(&self) -> Option<String> {
        self.notification_token.lock().clone()
    }

    /// Enqueue a text message for the writer task.
    ///
    /// Returns `false` if the channel is full or closed, incrementing the
    /// drop counter. Never blocks: a slow observer is skipped, not queued.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize a JSON value and enqueue it.
    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send(Arc::new(json)),
            Err(_) => false,
        }
    }

    /// Total messages dropped for this session.
    #[must_use]
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or inbound frame received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last pong (or connection establishment).
    #[must_use]
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for the heartbeat loop.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Tell the socket task to tear this connection down.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether [`Self::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once [`Self::close`] has been called.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }
}
