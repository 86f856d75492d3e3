//! HTTP server state

use std::sync::Arc;

use crate::api::client::ApiClient;
use crate::storage::acl::AclStore;
use crate::tailscale::controller::TailscaleController;

/// Shared state for HTTP handlers
pub struct ServerState {
    /// Tailscale state controller
    pub controller: Arc<TailscaleController>,

    /// ACL policy store
    pub acl: Arc<AclStore>,

    /// Control-plane API client; `None` when no token is configured
    pub api: Option<Arc<ApiClient>>,
}

impl ServerState {
    pub fn new(
        controller: Arc<TailscaleController>,
        acl: Arc<AclStore>,
        api: Option<Arc<ApiClient>>,
    ) -> Self {
        Self { controller, acl, api }
    }
}
