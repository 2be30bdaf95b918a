//! Device identity records.
//!
//! A [`DeviceRecord`] outlives any single connection: registration creates
//! it, disconnects only flip its state, and nothing ever deletes it. The
//! record holds a [`ConnectionId`] back-reference to its current session —
//! never the transport itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ConnectionId, DeviceId};

/// Whether a device currently has a live session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// A session is bound to this device.
    Connected,
    /// The last bound session has closed.
    Disconnected,
}

/// Long-lived identity record for a telemetry source.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceRecord {
    /// Stable device identifier.
    pub id: DeviceId,
    /// Human-readable name (defaults to the id).
    pub name: String,
    /// Device type label (defaults to `"unknown"`).
    pub device_type: String,
    /// Current connection state.
    pub state: ConnectionState,
    /// Remote address of the most recent session.
    pub ip: Option<String>,
    /// When the device was first registered or first reported data.
    pub first_seen: DateTime<Utc>,
    /// Last registration or sensor frame.
    pub last_seen: DateTime<Utc>,
    /// Identity of the current session, while connected. Compared by
    /// identity on disconnect so a superseded session cannot flip a live
    /// device to disconnected.
    pub session: Option<ConnectionId>,
}

impl DeviceRecord {
    /// Create a freshly connected record.
    #[must_use]
    pub fn new(id: DeviceId, name: String, device_type: String, session: ConnectionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            device_type,
            state: ConnectionState::Connected,
            ip: None,
            first_seen: now,
            last_seen: now,
            session: Some(session),
        }
    }

    /// Whether the device currently has a live session.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Refresh the `last_seen` timestamp.
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}

/// Wire projection of a [`DeviceRecord`] for the query surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Stable device identifier.
    pub device_id: DeviceId,
    /// Human-readable name.
    pub name: String,
    /// Device type label.
    #[serde(rename = "type")]
    pub device_type: String,
    /// Whether a session is currently bound.
    pub connected: bool,
    /// Remote address of the most recent session.
    pub ip: Option<String>,
    /// First registration time.
    pub first_seen: DateTime<Utc>,
    /// Last registration or sensor frame.
    pub last_seen: DateTime<Utc>,
}

impl From<&DeviceRecord> for DeviceInfo {
    fn from(record: &DeviceRecord) -> Self {
        Self {
            device_id: record.id.clone(),
            name: record.name.clone(),
            device_type: record.device_type.clone(),
            connected: record.is_connected(),
            ip: record.ip.clone(),
            first_seen: record.first_seen,
            last_seen: record.last_seen,
        }
    }
}
