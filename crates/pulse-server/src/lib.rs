//! # pulse-server
//!
//! Axum HTTP + `WebSocket` front end for the telemetry hub.
//!
//! - `WebSocket` gateway: welcome frame, frame dispatch, heartbeat,
//!   cleanup on disconnect
//! - REST query surface: device list, latest data, bounded history
//! - Health check, Prometheus `/metrics`, graceful shutdown
//! - Push delivery over an FCM-style HTTP endpoint

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod health;
pub mod metrics;
pub mod push;
pub mod server;
pub mod shutdown;
pub mod ws;

pub use config::ServerConfig;
pub use server::{AppState, PulseServer};
