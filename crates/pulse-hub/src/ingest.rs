//! Inbound frame dispatch.
//!
//! One entry point per text frame. Direct replies go only to the sender;
//! fan-out to observers and push delivery happen as side effects of sensor
//! frames. A malformed frame answers with an `error` frame and leaves all
//! state untouched.

use std::sync::Arc;

use pulse_core::DeviceId;

use crate::broadcast::SessionTable;
use crate::counters;
use crate::frames::{self, CriticalAlert, Frame};
use crate::hub::Hub;
use crate::push::{PushGateway, PushNotification};
use crate::registry::Registration;
use crate::session::SessionHandle;

/// Handle one inbound text frame from `session`.
pub async fn handle_frame(
    hub: &Hub,
    sessions: &SessionTable,
    push: &Arc<dyn PushGateway>,
    session: &Arc<SessionHandle>,
    text: &str,
) {
    let frame = match Frame::decode(text) {
        Ok(frame) => frame,
        Err(err) => {
            metrics::counter!(counters::INGEST_PROTOCOL_ERRORS_TOTAL).increment(1);
            tracing::debug!(connection_id = %session.id, error = %err, "rejecting frame");
            let _ = session.send_json(&frames::error_frame(&err.to_string()));
            return;
        }
    };

    match frame {
        Frame::Register(reg) => {
            metrics::counter!(counters::INGEST_FRAMES_TOTAL, "kind" => "register").increment(1);
            let record = hub.register(
                Registration {
                    device_id: reg.device_id.map(DeviceId::from),
                    name: reg.name,
                    device_type: reg.device_type,
                },
                &session.id,
                session.remote_addr.as_deref(),
            );
            metrics::counter!(counters::DEVICES_REGISTERED_TOTAL).increment(1);
            let _ = session.send_json(&frames::registered(&record.id, record.last_seen));
        }
        Frame::WebClient(wc) => {
            metrics::counter!(counters::INGEST_FRAMES_TOTAL, "kind" => "web_client").increment(1);
            tracing::info!(
                connection_id = %session.id,
                has_token = wc.notification_token.is_some(),
                "session became observer"
            );
            session.mark_observer(wc.notification_token);
            let _ = session.send_json(&frames::ack());
        }
        Frame::Sensor { device_id, metrics: sample_metrics } => {
            metrics::counter!(counters::INGEST_FRAMES_TOTAL, "kind" => "sensor").increment(1);
            let outcome = hub.record_sample(
                device_id,
                sample_metrics,
                &session.id,
                session.remote_addr.as_deref(),
            );
            if outcome.auto_registered {
                metrics::counter!(counters::DEVICES_REGISTERED_TOTAL).increment(1);
            }
            let _ = session.send_json(&frames::data_received(outcome.sample.received_at));

            let _ = sessions
                .broadcast_sensor_update(&session.id, &outcome.sample)
                .await;

            if let Some(triggered) = outcome.newly_critical {
                let alert =
                    CriticalAlert::new(&outcome.sample, &outcome.device_name, &triggered);
                metrics::counter!(counters::CRITICAL_ALERTS_TOTAL).increment(1);
                tracing::warn!(
                    device_id = %alert.device_id,
                    message = %alert.message,
                    "device entered critical state"
                );
                let (_, tokens) = sessions.broadcast_critical_alert(&alert).await;
                dispatch_push(push, tokens, &alert);
            }
        }
        Frame::Other => {
            metrics::counter!(counters::INGEST_FRAMES_TOTAL, "kind" => "other").increment(1);
            let _ = session.send_json(&frames::ack());
        }
    }
}

/// Fire-and-forget push delivery, one task per token.
fn dispatch_push(push: &Arc<dyn PushGateway>, tokens: Vec<String>, alert: &CriticalAlert) {
    if tokens.is_empty() {
        return;
    }
    let notification = PushNotification::from_alert(alert);
    for token in tokens {
        let push = Arc::clone(push);
        let notification = notification.clone();
        drop(tokio::spawn(async move {
            match push.send(&token, &notification).await {
                Ok(()) => {
                    metrics::counter!(counters::PUSH_SENDS_TOTAL).increment(1);
                }
                Err(err) => {
                    metrics::counter!(counters::PUSH_FAILURES_TOTAL).increment(1);
                    tracing::warn!(error = %err, "push delivery failed");
                }
            }
        }));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
