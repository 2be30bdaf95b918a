//! Wire frames: inbound decoding and outbound builders.
//!
//! Everything on the socket is JSON text. Inbound frames are dispatched on
//! their `type` field; a frame with no `type` but a `deviceId` and a
//! `metrics` object is a sensor reading. Outbound frames are built here so
//! every producer emits the same shapes.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use pulse_core::threshold::{self, Trigger};
use pulse_core::{DeviceId, HubError, SensorSample};

/// Payload of a `register` frame.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterFrame {
    /// Device-supplied id; generated when absent.
    pub device_id: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Device type label.
    pub device_type: Option<String>,
}

/// Payload of a `web_client` frame.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebClientFrame {
    /// Push token for out-of-band alert delivery. `fcmToken` is accepted
    /// as a legacy spelling.
    #[serde(alias = "fcmToken")]
    pub notification_token: Option<String>,
}

/// One decoded inbound frame.
#[derive(Debug)]
pub enum Frame {
    /// Explicit device registration.
    Register(RegisterFrame),
    /// Observer announcement.
    WebClient(WebClientFrame),
    /// Sensor reading (no `type` field, carries `deviceId` + `metrics`).
    Sensor {
        /// The reporting device.
        device_id: DeviceId,
        /// Numeric metric values; non-numeric entries are dropped.
        metrics: BTreeMap<String, f64>,
    },
    /// Well-formed JSON object the hub does not act on.
    Other,
}

impl Frame {
    /// Decode one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Protocol`] for invalid JSON, non-object
    /// payloads, or a typed frame whose fields have the wrong shape.
    pub fn decode(text: &str) -> Result<Self, HubError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| HubError::protocol(format!("invalid JSON: {err}")))?;
        let Value::Object(ref object) = value else {
            return Err(HubError::protocol("expected a JSON object"));
        };

        match object.get("type").and_then(Value::as_str) {
            Some("register") => {
                let frame: RegisterFrame = serde_json::from_value(value.clone())
                    .map_err(|err| HubError::protocol(format!("bad register frame: {err}")))?;
                Ok(Self::Register(frame))
            }
            Some("web_client") => {
                let frame: WebClientFrame = serde_json::from_value(value.clone())
                    .map_err(|err| HubError::protocol(format!("bad web_client frame: {err}")))?;
                Ok(Self::WebClient(frame))
            }
            Some(_) => Ok(Self::Other),
            None => {
                let device_id = object.get("deviceId").and_then(Value::as_str);
                let metrics = object.get("metrics").and_then(Value::as_object);
                match (device_id, metrics) {
                    (Some(device_id), Some(metrics)) => Ok(Self::Sensor {
                        device_id: device_id.into(),
                        metrics: metrics
                            .iter()
                            .filter_map(|(k, v)| v.as_f64().map(|v| (k.clone(), v)))
                            .collect(),
                    }),
                    _ => Ok(Self::Other),
                }
            }
        }
    }
}

/// A critical-state transition, ready for fan-out and push delivery.
#[derive(Clone, Debug)]
pub struct CriticalAlert {
    /// The device that went critical.
    pub device_id: DeviceId,
    /// Its display name.
    pub device_name: String,
    /// When the triggering sample was received.
    pub timestamp: DateTime<Utc>,
    /// The full metric mapping of the triggering sample.
    pub metrics: BTreeMap<String, f64>,
    /// Human-readable summary naming each crossed threshold.
    pub message: String,
}

impl CriticalAlert {
    /// Build an alert from the triggering sample and its threshold verdict.
    #[must_use]
    pub fn new(sample: &SensorSample, device_name: &str, triggered: &[Trigger]) -> Self {
        Self {
            device_id: sample.device_id.clone(),
            device_name: device_name.to_owned(),
            timestamp: sample.received_at,
            metrics: sample.metrics.clone(),
            message: threshold::alert_message(device_name, triggered),
        }
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Welcome frame sent once per connection, before anything else.
#[must_use]
pub fn welcome() -> Value {
    json!({
        "type": "connection",
        "message": "Connected to telemetry hub",
        "timestamp": rfc3339(Utc::now()),
    })
}

/// Acknowledges an explicit registration.
#[must_use]
pub fn registered(device_id: &DeviceId, ts: DateTime<Utc>) -> Value {
    json!({
        "type": "registered",
        "deviceId": device_id,
        "timestamp": rfc3339(ts),
    })
}

/// Acknowledges a stored sensor reading, to the producer only.
#[must_use]
pub fn data_received(ts: DateTime<Utc>) -> Value {
    json!({
        "type": "data_received",
        "timestamp": rfc3339(ts),
    })
}

/// Protocol-error reply; the connection stays open.
#[must_use]
pub fn error_frame(message: &str) -> Value {
    json!({
        "type": "error",
        "message": message,
        "timestamp": rfc3339(Utc::now()),
    })
}

/// Neutral acknowledgement for well-formed frames the hub does not act on.
#[must_use]
pub fn ack() -> Value {
    json!({
        "type": "ack",
        "message": "message received",
        "timestamp": rfc3339(Utc::now()),
    })
}

/// Sensor reading fan-out to observers.
#[must_use]
pub fn sensor_event(sample: &SensorSample) -> Value {
    json!({
        "type": "sensor_data",
        "data": sample,
    })
}

/// Critical-state fan-out to observers.
#[must_use]
pub fn critical_event(alert: &CriticalAlert) -> Value {
    json!({
        "type": "critical_state",
        "device": &alert.device_id,
        "deviceName": &alert.device_name,
        "timestamp": rfc3339(alert.timestamp),
        "metrics": &alert.metrics,
        "message": &alert.message,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_register() {
        let frame = Frame::decode(
            r#"{"type":"register","deviceId":"press_01","name":"Press","deviceType":"press"}"#,
        )
        .unwrap();
        let Frame::Register(reg) = frame else {
            panic!("expected register");
        };
        assert_eq!(reg.device_id.as_deref(), Some("press_01"));
        assert_eq!(reg.name.as_deref(), Some("Press"));
        assert_eq!(reg.device_type.as_deref(), Some("press"));
    }

    #[test]
    fn decode_register_all_fields_optional() {
        let frame = Frame::decode(r#"{"type":"register"}"#).unwrap();
        let Frame::Register(reg) = frame else {
            panic!("expected register");
        };
        assert!(reg.device_id.is_none());
    }

    #[test]
    fn decode_web_client_with_token() {
        let frame =
            Frame::decode(r#"{"type":"web_client","notificationToken":"tok_1"}"#).unwrap();
        let Frame::WebClient(wc) = frame else {
            panic!("expected web_client");
        };
        assert_eq!(wc.notification_token.as_deref(), Some("tok_1"));
    }

    #[test]
    fn decode_web_client_fcm_alias() {
        let frame = Frame::decode(r#"{"type":"web_client","fcmToken":"tok_2"}"#).unwrap();
        let Frame::WebClient(wc) = frame else {
            panic!("expected web_client");
        };
        assert_eq!(wc.notification_token.as_deref(), Some("tok_2"));
    }

    #[test]
    fn decode_sensor_frame() {
        let frame = Frame::decode(
            r#"{"deviceId":"d1","metrics":{"temperature":21.5,"vibration":12}}"#,
        )
        .unwrap();
        let Frame::Sensor { device_id, metrics } = frame else {
            panic!("expected sensor");
        };
        assert_eq!(device_id.as_str(), "d1");
        assert_eq!(metrics.get("temperature"), Some(&21.5));
        assert_eq!(metrics.get("vibration"), Some(&12.0));
    }

    #[test]
    fn sensor_frame_drops_non_numeric_metrics() {
        let frame = Frame::decode(
            r#"{"deviceId":"d1","metrics":{"temperature":21.5,"status":"ok"}}"#,
        )
        .unwrap();
        let Frame::Sensor { metrics, .. } = frame else {
            panic!("expected sensor");
        };
        assert_eq!(metrics.len(), 1);
        assert!(!metrics.contains_key("status"));
    }

    #[test]
    fn unknown_type_is_other() {
        assert!(matches!(
            Frame::decode(r#"{"type":"mystery","x":1}"#).unwrap(),
            Frame::Other
        ));
    }

    #[test]
    fn object_without_type_or_sensor_shape_is_other() {
        assert!(matches!(
            Frame::decode(r#"{"deviceId":"d1"}"#).unwrap(),
            Frame::Other
        ));
        assert!(matches!(
            Frame::decode(r#"{"metrics":{"temperature":1.0}}"#).unwrap(),
            Frame::Other
        ));
    }

    #[test]
    fn invalid_json_is_protocol_error() {
        let err = Frame::decode("not json").unwrap_err();
        assert!(matches!(err, HubError::Protocol { .. }));
    }

    #[test]
    fn non_object_is_protocol_error() {
        assert!(Frame::decode("[1,2,3]").is_err());
        assert!(Frame::decode("42").is_err());
        assert!(Frame::decode("\"hello\"").is_err());
    }

    #[test]
    fn welcome_shape() {
        let frame = welcome();
        assert_eq!(frame["type"], "connection");
        assert!(frame["timestamp"].is_string());
    }

    #[test]
    fn registered_shape() {
        let frame = registered(&"d1".into(), Utc::now());
        assert_eq!(frame["type"], "registered");
        assert_eq!(frame["deviceId"], "d1");
    }

    #[test]
    fn sensor_event_wraps_sample() {
        let mut metrics = BTreeMap::new();
        let _ = metrics.insert("temperature".to_owned(), 22.5);
        let sample = SensorSample::new("d1".into(), metrics);
        let frame = sensor_event(&sample);
        assert_eq!(frame["type"], "sensor_data");
        assert_eq!(frame["data"]["deviceId"], "d1");
        assert_eq!(frame["data"]["metrics"]["temperature"], 22.5);
    }

    #[test]
    fn critical_event_shape() {
        let mut metrics = BTreeMap::new();
        let _ = metrics.insert("temperature".to_owned(), 35.0);
        let sample = SensorSample::new("press_01".into(), metrics);
        let verdict = threshold::evaluate(&sample.metrics);
        let alert = CriticalAlert::new(&sample, "Hydraulic Press", &verdict.triggered);

        let frame = critical_event(&alert);
        assert_eq!(frame["type"], "critical_state");
        assert_eq!(frame["device"], "press_01");
        assert_eq!(frame["deviceName"], "Hydraulic Press");
        assert_eq!(frame["metrics"]["temperature"], 35.0);
        assert_eq!(frame["message"], "Hydraulic Press critical: temperature at 35");
    }

    #[test]
    fn error_frame_carries_message() {
        let frame = error_frame("invalid message format: bad");
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["message"], "invalid message format: bad");
    }
}
