//! Server configuration.
//!
//! Three layers, later wins: built-in defaults, an optional JSON config
//! file, then `PULSE_*` environment variables. A malformed file or an
//! unparseable numeric override is a startup error, not a silent default.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the hub server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `3000`; `0` auto-assigns).
    pub port: u16,
    /// Interval between server-initiated ping frames, in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this many seconds without a pong.
    pub heartbeat_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue depth.
    pub channel_capacity: usize,
    /// Push-notification delivery settings.
    pub push: PushConfig,
}

/// External push delivery. Disabled unless both fields are present.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// HTTP endpoint of the push service.
    pub endpoint: Option<String>,
    /// Server key sent in the `Authorization` header.
    pub server_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 16 * 1024 * 1024, // 16 MB
            channel_capacity: 1024,
            push: PushConfig::default(),
        }
    }
}

impl PushConfig {
    /// Whether push delivery is fully configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some() && self.server_key.is_some()
    }
}

/// Load configuration: defaults, then the file at `path` (if given), then
/// environment overrides.
pub fn load(path: Option<&Path>) -> Result<ServerConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => ServerConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Apply `PULSE_*` overrides from an environment lookup.
///
/// Split out from [`load`] so tests can inject variables without touching
/// process state.
fn apply_env_overrides(
    config: &mut ServerConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(host) = env("PULSE_HOST") {
        config.host = host;
    }
    if let Some(port) = env("PULSE_PORT") {
        config.port = port
            .parse()
            .with_context(|| format!("PULSE_PORT is not a port number: {port}"))?;
    }
    if let Some(secs) = env("PULSE_HEARTBEAT_INTERVAL_SECS") {
        config.heartbeat_interval_secs = secs
            .parse()
            .with_context(|| format!("PULSE_HEARTBEAT_INTERVAL_SECS is not a number: {secs}"))?;
    }
    if let Some(secs) = env("PULSE_HEARTBEAT_TIMEOUT_SECS") {
        config.heartbeat_timeout_secs = secs
            .parse()
            .with_context(|| format!("PULSE_HEARTBEAT_TIMEOUT_SECS is not a number: {secs}"))?;
    }
    if let Some(endpoint) = env("PULSE_PUSH_ENDPOINT") {
        config.push.endpoint = Some(endpoint);
    }
    if let Some(key) = env("PULSE_PUSH_SERVER_KEY") {
        config.push.server_key = Some(key);
    }
    Ok(())
}
