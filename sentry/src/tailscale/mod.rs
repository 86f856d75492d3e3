//! Tailscale CLI integration

pub mod binary;
pub mod cache;
pub mod controller;
pub mod reconcile;
pub mod runner;
pub mod service;
pub mod status;
pub mod text;
