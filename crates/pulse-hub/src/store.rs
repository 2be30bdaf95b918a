//! Bounded per-device sample storage.
//!
//! Latest-value map plus a newest-first history ring per device. Owned by
//! [`crate::hub::Hub`] and only touched under its lock.

use std::collections::{BTreeMap, HashMap, VecDeque};

use pulse_core::{DeviceId, SensorSample};

/// Samples retained per device before the oldest is evicted.
pub const MAX_HISTORY: usize = 1000;

/// In-memory sample storage for all devices.
#[derive(Default)]
pub struct SensorStore {
    latest: HashMap<DeviceId, SensorSample>,
    history: HashMap<DeviceId, VecDeque<SensorSample>>,
}

impl SensorStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample: replaces the latest value and prepends to history,
    /// evicting the oldest entry once the device is at capacity.
    pub fn append(&mut self, sample: SensorSample) {
        let history = self.history.entry(sample.device_id.clone()).or_default();
        history.push_front(sample.clone());
        if history.len() > MAX_HISTORY {
            let _ = history.pop_back();
        }
        let _ = self.latest.insert(sample.device_id.clone(), sample);
    }

    /// The most recent sample for a device.
    #[must_use]
    pub fn latest(&self, id: &DeviceId) -> Option<&SensorSample> {
        self.latest.get(id)
    }

    /// Up to `limit` samples for a device, newest first.
    ///
    /// Unknown devices yield an empty vec; whether the id is registered at
    /// all is the registry's question, not the store's.
    #[must_use]
    pub fn history_slice(&self, id: &DeviceId, limit: usize) -> Vec<SensorSample> {
        self.history
            .get(id)
            .map(|history| history.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of retained samples for a device.
    #[must_use]
    pub fn history_len(&self, id: &DeviceId) -> usize {
        self.history.get(id).map_or(0, VecDeque::len)
    }

    /// Snapshot of every device's latest sample, keyed by device id.
    #[must_use]
    pub fn all_latest(&self) -> BTreeMap<DeviceId, SensorSample> {
        self.latest
            .iter()
            .map(|(id, sample)| (id.clone(), sample.clone()))
            .collect()
    }
}
