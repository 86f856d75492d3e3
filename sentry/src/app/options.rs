//! Application configuration options

use std::time::Duration;

use crate::storage::layout::StorageLayout;
use crate::storage::settings::ApiSettings;
use crate::tailscale::controller::ControllerOptions;
use crate::workers::sampler;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage layout paths
    pub storage: StorageLayout,

    /// Enable local HTTP server
    pub enable_socket_server: bool,

    /// Enable the metrics sampler worker
    pub enable_sampler: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Sampler worker options
    pub sampler: sampler::Options,

    /// Tailscale controller options
    pub controller: ControllerOptions,

    /// Control-plane API settings
    pub api: ApiSettings,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            storage: StorageLayout::default(),
            enable_socket_server: true,
            enable_sampler: true,
            server: ServerOptions::default(),
            sampler: sampler::Options::default(),
            controller: ControllerOptions::default(),
            api: ApiSettings::default(),
        }
    }
}

/// Lifecycle options for the agent
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8384,
        }
    }
}
