//! Metric names recorded by the hub, kept in one place so the call sites
//! and the exporter docs cannot drift apart.

/// Broadcast messages dropped for slow observers (counter).
pub const BROADCAST_DROPS_TOTAL: &str = "pulse_broadcast_drops_total";
/// Inbound frames total (counter, labels: kind).
pub const INGEST_FRAMES_TOTAL: &str = "pulse_ingest_frames_total";
/// Rejected frames total (counter).
pub const INGEST_PROTOCOL_ERRORS_TOTAL: &str = "pulse_ingest_protocol_errors_total";
/// Devices registered total, explicit and automatic (counter).
pub const DEVICES_REGISTERED_TOTAL: &str = "pulse_devices_registered_total";
/// Critical-state transitions total (counter).
pub const CRITICAL_ALERTS_TOTAL: &str = "pulse_critical_alerts_total";
/// Push notifications delivered total (counter).
pub const PUSH_SENDS_TOTAL: &str = "pulse_push_sends_total";
/// Push notification failures total (counter).
pub const PUSH_FAILURES_TOTAL: &str = "pulse_push_failures_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_share_the_pulse_prefix() {
        let names = [
            BROADCAST_DROPS_TOTAL,
            INGEST_FRAMES_TOTAL,
            INGEST_PROTOCOL_ERRORS_TOTAL,
            DEVICES_REGISTERED_TOTAL,
            CRITICAL_ALERTS_TOTAL,
            PUSH_SENDS_TOTAL,
            PUSH_FAILURES_TOTAL,
        ];
        for name in names {
            assert!(name.starts_with("pulse_"), "metric '{name}' lacks the prefix");
        }
    }
}
