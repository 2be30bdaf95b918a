//! HTTP push gateway.
//!
//! Delivers critical alerts to backgrounded dashboard clients through an
//! FCM-style legacy HTTP endpoint: one POST per token, `Authorization:
//! key=<server_key>`, fire-and-forget from the caller's point of view.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use pulse_hub::push::{PushError, PushGateway, PushNotification};

use crate::config::PushConfig;

/// Per-request timeout. Push is best-effort; a hung delivery service must
/// not pin tasks.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Push gateway backed by an FCM-compatible HTTP endpoint.
pub struct HttpPushGateway {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl HttpPushGateway {
    /// Build a gateway from config. Returns `None` unless both the
    /// endpoint and the server key are configured.
    #[must_use]
    pub fn from_config(config: &PushConfig) -> Option<Self> {
        let endpoint = config.endpoint.clone()?;
        let server_key = config.server_key.clone()?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .ok()?;
        Some(Self {
            client,
            endpoint,
            server_key,
        })
    }

    #[cfg(test)]
    fn for_endpoint(endpoint: String, server_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            server_key,
        }
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn send(&self, token: &str, notification: &PushNotification) -> Result<(), PushError> {
        let body = json!({
            "to": token,
            "notification": {
                "title": notification.title,
                "body": notification.body,
            },
            "data": notification.data,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| PushError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = %status, "push delivered");
            Ok(())
        } else {
            Err(PushError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
