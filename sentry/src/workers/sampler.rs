//! Background metrics sampler.
//!
//! Keeps the rolling metrics history populated while the dashboard is idle
//! by refreshing status on a fixed interval. Each refresh records a sample
//! as a side effect of the controller's status path.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::tailscale::controller::TailscaleController;

/// Sampler worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Sampling interval
    pub interval: Duration,

    /// Initial delay before the first sample
    pub initial_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(5),
        }
    }
}

/// Run the sampler worker
pub async fn run<S, F>(
    options: &Options,
    controller: Arc<TailscaleController>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Metrics sampler starting...");

    sleep_fn(options.initial_delay).await;

    loop {
        // Check for shutdown
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Metrics sampler shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {
                // Continue with sampling
            }
        }

        debug!("Sampling tailnet status...");

        match controller.get_status(true).await {
            Ok(status) => {
                debug!(peers = status.peers.len(), "Status sample recorded");
            }
            Err(e) => {
                error!("Status sample failed: {}", e);
            }
        }
    }
}
