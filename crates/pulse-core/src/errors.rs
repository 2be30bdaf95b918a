//! Error hierarchy for the hub.
//!
//! Nothing in this subsystem is process-fatal: protocol errors are answered
//! on the offending connection, unknown-device queries surface as not-found,
//! and transport failures during broadcast are skipped per recipient.

use thiserror::Error;

use crate::ids::DeviceId;

/// Errors surfaced by the hub core.
#[derive(Debug, Error)]
pub enum HubError {
    /// An inbound frame could not be decoded as a known message shape.
    ///
    /// Recovered locally: the sender gets an `error` frame and the
    /// connection stays open. No state is mutated.
    #[error("invalid message format: {message}")]
    Protocol {
        /// What was wrong with the frame.
        message: String,
    },

    /// A query named a device the registry has never seen.
    #[error("device '{device_id}' not found")]
    DeviceNotFound {
        /// The unknown id.
        device_id: DeviceId,
    },
}

impl HubError {
    /// Protocol error from any displayable cause.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Not-found error for a device id.
    #[must_use]
    pub fn device_not_found(device_id: impl Into<DeviceId>) -> Self {
        Self::DeviceNotFound {
            device_id: device_id.into(),
        }
    }
}
