//! vitalwatch - emergency vitals dispatch service
//!
//! Polls a realtime telemetry store for per-subject emergency snapshots,
//! admits fresh ones into an append-only SQLite ledger, assigns each alert
//! to the nearest hospital by great-circle distance, and delivers
//! best-effort push notifications to the patient and the hospital. Serving
//! an assignment is triggered externally through the HTTP API.
//!
//! ## Components
//!
//! - **telemetry**: polling client for the realtime store
//! - **pipeline**: poll loop, dedup admission gate, nearest-hospital matcher
//! - **db**: alert ledger, assignment lifecycle, served history
//! - **notify**: bounded queue in front of the Expo push gateway
//! - **routes**: query and action endpoints for the mobile apps

pub mod config;
pub mod db;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod routes;
pub mod telemetry;
pub mod types;

pub use config::Args;
pub use types::{DispatchError, Result};
