//! Device registry — identity records keyed by device id.
//!
//! Not internally synchronized: the registry is owned by [`crate::hub::Hub`]
//! and only touched under its lock.

use std::collections::HashMap;

use chrono::Utc;

use pulse_core::{ConnectionId, ConnectionState, DeviceId, DeviceRecord};

/// Fields accepted by a registration.
#[derive(Clone, Debug, Default)]
pub struct Registration {
    /// Device-supplied id; a UUID v7 is generated when absent.
    pub device_id: Option<DeviceId>,
    /// Display name; defaults to the id.
    pub name: Option<String>,
    /// Device type label; defaults to `"unknown"`.
    pub device_type: Option<String>,
}

/// All known devices and their current session bindings.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceId, DeviceRecord>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, creating or updating its record.
    ///
    /// A re-registration for a known id supersedes the previous session
    /// binding without deleting anything; the record always comes out
    /// connected with a fresh `last_seen`.
    pub fn register(
        &mut self,
        reg: Registration,
        session: &ConnectionId,
        ip: Option<&str>,
    ) -> DeviceRecord {
        use std::collections::hash_map::Entry;

        let id = reg.device_id.unwrap_or_default();
        let record = match self.devices.entry(id.clone()) {
            Entry::Occupied(entry) => {
                let record = entry.into_mut();
                if let Some(name) = reg.name {
                    record.name = name;
                }
                if let Some(device_type) = reg.device_type {
                    record.device_type = device_type;
                }
                record
            }
            Entry::Vacant(entry) => {
                let name = reg.name.unwrap_or_else(|| id.as_str().to_owned());
                let device_type = reg.device_type.unwrap_or_else(|| "unknown".to_owned());
                entry.insert(DeviceRecord::new(id, name, device_type, session.clone()))
            }
        };

        record.state = ConnectionState::Connected;
        record.session = Some(session.clone());
        record.ip = ip.map(ToOwned::to_owned);
        record.touch();
        record.clone()
    }

    /// Auto-register a device from its first sensor frame: the frame's id
    /// becomes both id and name.
    pub fn auto_register(
        &mut self,
        device_id: &DeviceId,
        session: &ConnectionId,
        ip: Option<&str>,
    ) -> DeviceRecord {
        self.register(
            Registration {
                device_id: Some(device_id.clone()),
                name: None,
                device_type: None,
            },
            session,
            ip,
        )
    }

    /// Refresh a known device on sensor activity.
    ///
    /// Updates `last_seen` without stealing the session binding: the
    /// session is re-bound only when the record has none, i.e. the device
    /// was disconnected and went straight back to reporting. A frame still
    /// in flight from a superseded connection leaves the current binding
    /// alone, so its later close cannot trip the disconnect path. Returns
    /// `None` for an unknown id.
    pub fn refresh_activity(
        &mut self,
        id: &DeviceId,
        session: &ConnectionId,
        ip: Option<&str>,
    ) -> Option<DeviceRecord> {
        let record = self.devices.get_mut(id)?;
        if record.session.is_none() {
            record.session = Some(session.clone());
            record.ip = ip.map(ToOwned::to_owned);
        }
        record.state = ConnectionState::Connected;
        record.touch();
        Some(record.clone())
    }

    /// Mark the device owning `session` disconnected, if any.
    ///
    /// Stale-session guard: the record only flips if its *current* session
    /// id equals the closing one. A connection that was superseded by a
    /// reconnect finds no matching record and changes nothing. Returns the
    /// affected device id when a record was flipped.
    pub fn mark_disconnected(&mut self, session: &ConnectionId) -> Option<DeviceId> {
        let id = self.find_by_session(session)?.id.clone();
        let record = self.devices.get_mut(&id)?;
        record.state = ConnectionState::Disconnected;
        record.session = None;
        record.last_seen = Utc::now();
        Some(id)
    }

    /// Reverse lookup: the device currently bound to `session`.
    #[must_use]
    pub fn find_by_session(&self, session: &ConnectionId) -> Option<&DeviceRecord> {
        self.devices
            .values()
            .find(|record| record.session.as_ref() == Some(session))
    }

    /// Get a device record by id.
    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<&DeviceRecord> {
        self.devices.get(id)
    }

    /// Whether a device id is known.
    #[must_use]
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.contains_key(id)
    }

    /// Snapshot of all records, ordering not guaranteed.
    #[must_use]
    pub fn list(&self) -> Vec<DeviceRecord> {
        self.devices.values().cloned().collect()
    }

    /// Number of known devices (connected or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no device has ever registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
