//! Critical-threshold evaluation.
//!
//! A pure function of one sample's metric mapping. The evaluator has no
//! memory: edge detection against the previously stored critical flag is
//! the hub coordinator's job.

use serde::{Deserialize, Serialize};

/// Temperature at or above this is critical (°C).
pub const TEMPERATURE_CRITICAL: f64 = 30.0;
/// Vibration at or above this is critical (%).
pub const VIBRATION_CRITICAL: f64 = 80.0;
/// Light at or below this is critical (%).
pub const LIGHT_CRITICAL: f64 = 20.0;

/// One metric that crossed its threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Metric name (`temperature`, `vibration`, `light`).
    pub metric: String,
    /// The observed value.
    pub value: f64,
}

/// Result of evaluating one sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Verdict {
    /// The metrics that crossed their thresholds, in a stable order.
    pub triggered: Vec<Trigger>,
}

impl Verdict {
    /// Whether any threshold was crossed.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        !self.triggered.is_empty()
    }
}

/// Evaluate a metric mapping against the fixed thresholds.
///
/// Absent metrics never trigger; neither do non-finite values (a NaN
/// comparison is false either way, but infinities are rejected explicitly
/// so a garbage reading cannot latch a device critical).
#[must_use]
pub fn evaluate(metrics: &std::collections::BTreeMap<String, f64>) -> Verdict {
    let mut triggered = Vec::new();

    let mut check = |name: &str, crossed: fn(f64) -> bool| {
        if let Some(&value) = metrics.get(name) {
            if value.is_finite() && crossed(value) {
                triggered.push(Trigger {
                    metric: name.to_owned(),
                    value,
                });
            }
        }
    };

    check("temperature", |v| v >= TEMPERATURE_CRITICAL);
    check("vibration", |v| v >= VIBRATION_CRITICAL);
    check("light", |v| v <= LIGHT_CRITICAL);

    Verdict { triggered }
}

/// Compose the human-readable alert message for a set of triggers.
///
/// Example: `"Hydraulic Press critical: temperature at 35, vibration at 92.5"`.
#[must_use]
pub fn alert_message(device_name: &str, triggered: &[Trigger]) -> String {
    let parts: Vec<String> = triggered
        .iter()
        .map(|t| format!("{} at {}", t.metric, t.value))
        .collect();
    format!("{device_name} critical: {}", parts.join(", "))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
