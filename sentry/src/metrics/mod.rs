//! Tailnet metrics

pub mod history;
