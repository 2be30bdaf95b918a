//! # pulse-hub
//!
//! The broker core of the Pulse telemetry hub.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `session` | Per-connection handle: role, notification token, bounded send queue |
//! | `registry` | Device records: register/supersede, stale-session disconnect guard |
//! | `store` | Latest sample + bounded history per device |
//! | `hub` | Coordinator owning registry, store and critical flags behind one lock |
//! | `frames` | Inbound frame decoding and outbound frame builders |
//! | `ingest` | Frame dispatch: replies to the sender, fan-out, push alerts |
//! | `broadcast` | Session table and event fan-out to observers |
//! | `push` | External push-notification boundary |
//! | `counters` | Metric names recorded by the hub |
//!
//! Data flows one way per event: inbound frame → `ingest` → (`hub` update,
//! threshold evaluation) → `broadcast` → observer sessions. The query
//! surface reads through `hub` with no write effects.

#![deny(unsafe_code)]

pub mod broadcast;
pub mod counters;
pub mod frames;
pub mod hub;
pub mod ingest;
pub mod push;
pub mod registry;
pub mod session;
pub mod store;

pub use broadcast::SessionTable;
pub use hub::Hub;
pub use push::{PushGateway, PushNotification};
pub use session::{SessionHandle, SessionRole};
