//! # pulse-core
//!
//! Core types for the Pulse telemetry hub.
//!
//! - Branded ID newtypes ([`DeviceId`], [`ConnectionId`])
//! - The data model: [`DeviceRecord`], [`SensorSample`]
//! - The pure critical-threshold evaluator ([`threshold::evaluate`])
//! - The [`HubError`] hierarchy

#![deny(unsafe_code)]

pub mod device;
pub mod errors;
pub mod ids;
pub mod sample;
pub mod threshold;

pub use device::{ConnectionState, DeviceInfo, DeviceRecord};
pub use errors::HubError;
pub use ids::{ConnectionId, DeviceId};
pub use sample::SensorSample;
