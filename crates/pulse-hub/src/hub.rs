//! Hub coordinator: the single writer over registry, store and critical
//! flags.
//!
//! Every state mutation for one inbound event happens inside one lock
//! acquisition, so an observer reading through the query surface never sees
//! a sample without its registration, or an alert decision taken against a
//! half-applied update.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use pulse_core::threshold::{self, Trigger};
use pulse_core::{ConnectionId, DeviceId, DeviceRecord, SensorSample};

use crate::registry::{DeviceRegistry, Registration};
use crate::store::SensorStore;

struct HubState {
    registry: DeviceRegistry,
    store: SensorStore,
    /// Edge-detection memory: whether the device's last sample was critical.
    critical: HashMap<DeviceId, bool>,
}

/// What [`Hub::record_sample`] did, for the caller to act on.
pub struct IngestOutcome {
    /// The stored sample.
    pub sample: SensorSample,
    /// Display name of the reporting device.
    pub device_name: String,
    /// Whether this frame implicitly registered the device.
    pub auto_registered: bool,
    /// `Some` only on a normal-to-critical transition; carries the
    /// triggers so the caller can build the alert. Repeated critical
    /// samples stay `None` until the device recovers.
    pub newly_critical: Option<Vec<Trigger>>,
}

/// Shared coordinator over all device state.
pub struct Hub {
    inner: Mutex<HubState>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubState {
                registry: DeviceRegistry::new(),
                store: SensorStore::new(),
                critical: HashMap::new(),
            }),
        }
    }

    /// Register a device explicitly.
    pub fn register(
        &self,
        reg: Registration,
        session: &ConnectionId,
        ip: Option<&str>,
    ) -> DeviceRecord {
        let mut state = self.inner.lock();
        let record = state.registry.register(reg, session, ip);
        tracing::info!(
            device_id = %record.id,
            name = %record.name,
            device_type = %record.device_type,
            "device registered"
        );
        record
    }

    /// Store one sensor reading and evaluate it, all under one lock.
    ///
    /// Auto-registers unknown devices, refreshes `last_seen`, appends to
    /// history and performs critical edge detection.
    pub fn record_sample(
        &self,
        device_id: DeviceId,
        metrics: BTreeMap<String, f64>,
        session: &ConnectionId,
        ip: Option<&str>,
    ) -> IngestOutcome {
        let mut state = self.inner.lock();

        // Known devices are only refreshed; a full register here would let
        // an in-flight frame from a superseded connection steal the session
        // binding and defeat the disconnect guard.
        let (record, auto_registered) =
            match state.registry.refresh_activity(&device_id, session, ip) {
                Some(record) => (record, false),
                None => {
                    tracing::info!(device_id = %device_id, "auto-registering device from sensor frame");
                    (state.registry.auto_register(&device_id, session, ip), true)
                }
            };

        let sample = SensorSample::new(device_id.clone(), metrics);
        state.store.append(sample.clone());

        let verdict = threshold::evaluate(&sample.metrics);
        let was_critical = state
            .critical
            .insert(device_id.clone(), verdict.is_critical())
            .unwrap_or(false);
        let newly_critical = (verdict.is_critical() && !was_critical).then_some(verdict.triggered);

        IngestOutcome {
            sample,
            device_name: record.name,
            auto_registered,
            newly_critical,
        }
    }

    /// Flip the device bound to `session` to disconnected, if it still is.
    /// Returns the affected device id.
    pub fn mark_disconnected(&self, session: &ConnectionId) -> Option<DeviceId> {
        let device_id = self.inner.lock().registry.mark_disconnected(session)?;
        tracing::info!(device_id = %device_id, "device disconnected");
        Some(device_id)
    }

    // ── query surface, read-only ──

    /// Snapshot of all device records.
    #[must_use]
    pub fn list_devices(&self) -> Vec<DeviceRecord> {
        self.inner.lock().registry.list()
    }

    /// Whether a device id has ever been registered.
    #[must_use]
    pub fn device_known(&self, id: &DeviceId) -> bool {
        self.inner.lock().registry.contains(id)
    }

    /// Number of known devices, connected or not.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.inner.lock().registry.len()
    }

    /// Latest sample for a device.
    #[must_use]
    pub fn latest(&self, id: &DeviceId) -> Option<SensorSample> {
        self.inner.lock().store.latest(id).cloned()
    }

    /// Up to `limit` samples for a device, newest first.
    #[must_use]
    pub fn history_slice(&self, id: &DeviceId, limit: usize) -> Vec<SensorSample> {
        self.inner.lock().store.history_slice(id, limit)
    }

    /// Latest sample for every device that has reported, keyed by id.
    #[must_use]
    pub fn all_latest(&self) -> BTreeMap<DeviceId, SensorSample> {
        self.inner.lock().store.all_latest()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    #[test]
    fn sample_from_unknown_device_auto_registers() {
        let hub = Hub::new();
        let outcome = hub.record_sample(
            "press_01".into(),
            metrics(&[("temperature", 22.0)]),
            &"c1".into(),
            Some("10.0.0.3"),
        );
        assert!(outcome.auto_registered);
        assert_eq!(outcome.device_name, "press_01");
        assert!(hub.device_known(&"press_01".into()));

        let devices = hub.list_devices();
        assert_eq!(devices.len(), 1);
        assert!(devices[0].is_connected());
        assert_eq!(devices[0].ip.as_deref(), Some("10.0.0.3"));
    }

    #[test]
    fn sample_from_registered_device_is_not_auto() {
        let hub = Hub::new();
        let _ = hub.register(
            Registration {
                device_id: Some("d1".into()),
                name: Some("Press".into()),
                device_type: None,
            },
            &"c1".into(),
            None,
        );
        let outcome =
            hub.record_sample("d1".into(), metrics(&[("temperature", 22.0)]), &"c1".into(), None);
        assert!(!outcome.auto_registered);
        assert_eq!(outcome.device_name, "Press", "registered name survives");
    }

    #[test]
    fn normal_sample_is_not_newly_critical() {
        let hub = Hub::new();
        let outcome =
            hub.record_sample("d1".into(), metrics(&[("temperature", 22.0)]), &"c1".into(), None);
        assert!(outcome.newly_critical.is_none());
    }

    #[test]
    fn first_critical_sample_raises_edge() {
        let hub = Hub::new();
        let outcome =
            hub.record_sample("d1".into(), metrics(&[("temperature", 35.0)]), &"c1".into(), None);
        let triggered = outcome.newly_critical.expect("edge expected");
        assert_eq!(triggered[0].metric, "temperature");
    }

    #[test]
    fn repeated_critical_samples_do_not_re_raise() {
        let hub = Hub::new();
        let conn = ConnectionId::from("c1");
        let first =
            hub.record_sample("d1".into(), metrics(&[("temperature", 35.0)]), &conn, None);
        assert!(first.newly_critical.is_some());
        let second =
            hub.record_sample("d1".into(), metrics(&[("temperature", 36.0)]), &conn, None);
        assert!(second.newly_critical.is_none(), "still critical, no new edge");
    }

    #[test]
    fn recovery_then_critical_raises_again() {
        let hub = Hub::new();
        let conn = ConnectionId::from("c1");
        let _ = hub.record_sample("d1".into(), metrics(&[("temperature", 35.0)]), &conn, None);
        let _ = hub.record_sample("d1".into(), metrics(&[("temperature", 22.0)]), &conn, None);
        let again =
            hub.record_sample("d1".into(), metrics(&[("temperature", 31.0)]), &conn, None);
        assert!(again.newly_critical.is_some());
    }

    #[test]
    fn critical_flags_are_per_device() {
        let hub = Hub::new();
        let conn = ConnectionId::from("c1");
        let _ = hub.record_sample("a".into(), metrics(&[("temperature", 35.0)]), &conn, None);
        let b = hub.record_sample("b".into(), metrics(&[("vibration", 95.0)]), &"c2".into(), None);
        assert!(b.newly_critical.is_some(), "device a's state does not mask b");
    }

    #[test]
    fn query_surface_sees_stored_samples() {
        let hub = Hub::new();
        let conn = ConnectionId::from("c1");
        let _ = hub.record_sample("d1".into(), metrics(&[("temperature", 20.0)]), &conn, None);
        let _ = hub.record_sample("d1".into(), metrics(&[("temperature", 21.0)]), &conn, None);

        assert_eq!(
            hub.latest(&"d1".into()).unwrap().metric("temperature"),
            Some(21.0)
        );
        assert_eq!(hub.history_slice(&"d1".into(), 10).len(), 2);
        assert_eq!(hub.all_latest().len(), 1);
        assert_eq!(hub.device_count(), 1);
    }

    #[test]
    fn disconnect_keeps_device_and_data() {
        let hub = Hub::new();
        let conn = ConnectionId::from("c1");
        let _ = hub.record_sample("d1".into(), metrics(&[("temperature", 20.0)]), &conn, None);

        assert_eq!(hub.mark_disconnected(&conn).as_deref(), Some("d1"));
        let devices = hub.list_devices();
        assert!(!devices[0].is_connected());
        assert!(hub.latest(&"d1".into()).is_some(), "data survives disconnect");
    }

    #[test]
    fn stale_sensor_frame_cannot_steal_session_binding() {
        let hub = Hub::new();
        let old = ConnectionId::from("c_old");
        let new = ConnectionId::from("c_new");
        let registration = |conn: &ConnectionId| {
            hub.register(
                Registration {
                    device_id: Some("d1".into()),
                    name: None,
                    device_type: None,
                },
                conn,
                None,
            )
        };
        let _ = registration(&old);
        let _ = registration(&new);

        // A frame from the superseded connection arrives late.
        let outcome =
            hub.record_sample("d1".into(), metrics(&[("temperature", 22.0)]), &old, None);
        assert!(!outcome.auto_registered);

        // When the old connection closes, the live device stays connected.
        assert!(hub.mark_disconnected(&old).is_none());
        let devices = hub.list_devices();
        assert!(devices[0].is_connected());
        assert_eq!(devices[0].session, Some(new));
    }

    #[test]
    fn sample_after_disconnect_rebinds_device() {
        let hub = Hub::new();
        let _ = hub.record_sample("d1".into(), metrics(&[("temperature", 20.0)]), &"c1".into(), None);
        let _ = hub.mark_disconnected(&"c1".into());

        let outcome =
            hub.record_sample("d1".into(), metrics(&[("temperature", 21.0)]), &"c2".into(), None);
        assert!(!outcome.auto_registered, "record survived the disconnect");
        let devices = hub.list_devices();
        assert!(devices[0].is_connected());
        assert_eq!(devices[0].session.as_deref(), Some("c2"));
    }

    #[test]
    fn disconnect_of_unknown_session_is_noop() {
        let hub = Hub::new();
        assert!(hub.mark_disconnected(&"ghost".into()).is_none());
    }
}
