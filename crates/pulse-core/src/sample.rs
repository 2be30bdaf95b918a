//! Sensor samples — one reading from one device.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::DeviceId;

/// One sensor reading as stored by the hub. Immutable once created.
///
/// `metrics` is an open mapping: the canonical keys are `temperature`,
/// `vibration`, `light` and `humidity`, but devices may report anything.
/// `received_at` is the hub's receipt time, not a device clock — history
/// ordering is strictly by arrival.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSample {
    /// Device that produced the reading.
    pub device_id: DeviceId,
    /// Named metric values.
    pub metrics: BTreeMap<String, f64>,
    /// When the hub received the reading.
    pub received_at: DateTime<Utc>,
}

impl SensorSample {
    /// Create a sample stamped with the current time.
    #[must_use]
    pub fn new(device_id: DeviceId, metrics: BTreeMap<String, f64>) -> Self {
        Self {
            device_id,
            metrics,
            received_at: Utc::now(),
        }
    }

    /// Look up a single metric by name.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}
