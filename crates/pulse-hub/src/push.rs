//! Out-of-band push-notification boundary.
//!
//! Critical alerts are delivered twice: over the socket to every observer,
//! and through a [`PushGateway`] to each distinct notification token so a
//! backgrounded dashboard still hears about it. The concrete HTTP gateway
//! lives in the server crate; the hub only knows the trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::frames::CriticalAlert;

/// A push message ready for an external delivery service.
#[derive(Clone, Debug, PartialEq)]
pub struct PushNotification {
    /// Short title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Structured payload for the receiving app.
    pub data: BTreeMap<String, String>,
}

impl PushNotification {
    /// Build the push rendering of a critical alert.
    #[must_use]
    pub fn from_alert(alert: &CriticalAlert) -> Self {
        let mut data = BTreeMap::new();
        let _ = data.insert("deviceId".to_owned(), alert.device_id.as_str().to_owned());
        let _ = data.insert("timestamp".to_owned(), alert.timestamp.to_rfc3339());
        Self {
            title: format!("{} critical", alert.device_name),
            body: alert.message.clone(),
            data,
        }
    }
}

/// Push delivery failure. Logged and dropped; alert delivery over the
/// socket is never coupled to push success.
#[derive(Debug, Error)]
pub enum PushError {
    /// The delivery service could not be reached or timed out.
    #[error("push transport error: {0}")]
    Transport(String),
    /// The delivery service answered with a non-success status.
    #[error("push rejected with status {status}")]
    Rejected {
        /// HTTP status code returned.
        status: u16,
    },
}

/// Delivery backend for push notifications.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver one notification to one token.
    async fn send(&self, token: &str, notification: &PushNotification) -> Result<(), PushError>;
}

/// Gateway that drops everything. Used when no push endpoint is configured.
#[derive(Default)]
pub struct NoopGateway;

#[async_trait]
impl PushGateway for NoopGateway {
    async fn send(&self, token: &str, _notification: &PushNotification) -> Result<(), PushError> {
        tracing::debug!(token, "push not configured, dropping notification");
        Ok(())
    }
}
