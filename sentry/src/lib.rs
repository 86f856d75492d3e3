//! TailSentry Agent Library
//!
//! Core modules for the TailSentry agent: a local controller over the
//! tailscale CLI with a small HTTP surface.

pub mod api;
pub mod app;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod metrics;
pub mod server;
pub mod storage;
pub mod tailscale;
pub mod telemetry;
pub mod utils;
pub mod workers;
