//! Application state management

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::client::ApiClient;
use crate::app::options::AppOptions;
use crate::errors::SentryError;
use crate::metrics::history::{self, MetricsHistory};
use crate::storage::acl::AclStore;
use crate::tailscale::cache::SystemClock;
use crate::tailscale::controller::TailscaleController;
use crate::tailscale::runner::SystemRunner;

/// Main application state
pub struct AppState {
    /// Tailscale state controller
    pub controller: Arc<TailscaleController>,

    /// ACL policy store
    pub acl: Arc<AclStore>,

    /// Control-plane API client, when configured
    pub api: Option<Arc<ApiClient>>,
}

impl AppState {
    /// Initialize application state
    pub async fn init(options: &AppOptions) -> Result<Self, SentryError> {
        info!("Initializing application state...");

        options.storage.setup().await?;

        let history = Arc::new(
            MetricsHistory::load(history::DEFAULT_WINDOW, options.storage.metrics_file()).await,
        );

        let controller = Arc::new(TailscaleController::new(
            options.controller.clone(),
            Arc::new(SystemRunner),
            Arc::new(SystemClock),
            history,
        ));
        info!(binary = %controller.binary(), "Tailscale controller ready");

        let acl = Arc::new(AclStore::new(
            options.storage.acl_file(),
            options.storage.acl_backup_dir(),
        ));

        let api = match ApiClient::from_settings(&options.api) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Control-plane API disabled: {}", e);
                None
            }
        };

        Ok(Self { controller, acl, api })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), SentryError> {
        info!("Shutting down application state...");
        Ok(())
    }
}
