//! Tailscale control-plane API

pub mod client;
pub mod devices;
pub mod keys;
