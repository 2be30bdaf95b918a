//! Session table and event fan-out.
//!
//! Holds every live connection and pushes hub events to observer sessions.
//! Each event is serialized once into an `Arc<String>` and the same buffer
//! is enqueued on every recipient. A session that has dropped too many
//! messages is evicted from the table and told to close; its socket task
//! observes [`SessionHandle::closed`] and tears the connection down.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use pulse_core::ConnectionId;

use crate::counters;
use crate::frames::{self, CriticalAlert};
use crate::session::SessionHandle;
use pulse_core::SensorSample;

/// Dropped-message budget per session before it is evicted.
const MAX_TOTAL_DROPS: u64 = 100;

/// All live connections, device and observer alike.
#[derive(Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<ConnectionId, Arc<SessionHandle>>>,
    count: AtomicUsize,
}

impl SessionTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly opened connection.
    pub async fn add(&self, session: Arc<SessionHandle>) {
        let id = session.id.clone();
        let previous = self.sessions.write().await.insert(id.clone(), session);
        if previous.is_none() {
            let _ = self.count.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(connection_id = %id, "session added");
    }

    /// Remove a connection, returning its handle if it was present.
    pub async fn remove(&self, id: &ConnectionId) -> Option<Arc<SessionHandle>> {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            let _ = self.count.fetch_sub(1, Ordering::Relaxed);
            tracing::debug!(connection_id = %id, "session removed");
        }
        removed
    }

    /// Look up one session by id.
    pub async fn get(&self, id: &ConnectionId) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Number of live connections. Lock-free, may lag a concurrent update.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Snapshot of every live session, for the heartbeat sweep.
    pub async fn snapshot(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Fan a sensor reading out to observers, excluding the producer.
    ///
    /// Returns the number of sessions the event was enqueued on.
    pub async fn broadcast_sensor_update(
        &self,
        origin: &ConnectionId,
        sample: &SensorSample,
    ) -> usize {
        let payload = match serde_json::to_string(&frames::sensor_event(sample)) {
            Ok(json) => Arc::new(json),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize sensor event");
                return 0;
            }
        };
        self.fan_out(&payload, Some(origin)).await
    }

    /// Fan a critical alert out to all observers.
    ///
    /// Returns the delivery count and the distinct notification tokens of
    /// observer sessions, for out-of-band push delivery.
    pub async fn broadcast_critical_alert(&self, alert: &CriticalAlert) -> (usize, Vec<String>) {
        let payload = match serde_json::to_string(&frames::critical_event(alert)) {
            Ok(json) => Arc::new(json),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize critical alert");
                return (0, Vec::new());
            }
        };

        let mut tokens: Vec<String> = Vec::new();
        {
            let sessions = self.sessions.read().await;
            for session in sessions.values() {
                if let Some(token) = session.notification_token() {
                    if !tokens.contains(&token) {
                        tokens.push(token);
                    }
                }
            }
        }

        let delivered = self.fan_out(&payload, None).await;
        (delivered, tokens)
    }

    /// Enqueue `payload` on every observer session except `skip`.
    async fn fan_out(&self, payload: &Arc<String>, skip: Option<&ConnectionId>) -> usize {
        let recipients: Vec<Arc<SessionHandle>> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|s| s.is_observer() && Some(&s.id) != skip)
                .cloned()
                .collect()
        };

        let mut delivered = 0;
        let mut evict: Vec<ConnectionId> = Vec::new();
        for session in recipients {
            if session.send(Arc::clone(payload)) {
                delivered += 1;
            } else {
                metrics::counter!(counters::BROADCAST_DROPS_TOTAL).increment(1);
                if session.drop_count() >= MAX_TOTAL_DROPS {
                    evict.push(session.id.clone());
                }
            }
        }

        for id in evict {
            tracing::warn!(connection_id = %id, "evicting slow observer session");
            if let Some(session) = self.remove(&id).await {
                session.close();
            }
        }
        delivered
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
