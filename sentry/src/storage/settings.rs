//! Settings file management

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Local HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Tailscale CLI configuration
    #[serde(default)]
    pub tailscale: TailscaleSettings,

    /// Tailscale control-plane API configuration
    #[serde(default)]
    pub api: ApiSettings,

    /// Metrics sampler configuration
    #[serde(default)]
    pub sampler: SamplerSettings,
}

fn default_true() -> bool {
    true
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8384
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Tailscale CLI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailscaleSettings {
    /// Explicit binary path; discovered when absent
    #[serde(default)]
    pub binary_path: Option<String>,

    /// Status cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Bypass the status cache on every read
    #[serde(default)]
    pub always_live: bool,

    /// Timeout for status reads in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Timeout for mutating calls in seconds
    #[serde(default = "default_mutate_timeout")]
    pub mutate_timeout_secs: u64,

    /// Accept routes advertised by other devices
    #[serde(default = "default_true")]
    pub accept_routes: bool,
}

fn default_cache_ttl() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    10
}

fn default_mutate_timeout() -> u64 {
    30
}

impl Default for TailscaleSettings {
    fn default() -> Self {
        Self {
            binary_path: None,
            cache_ttl_secs: default_cache_ttl(),
            always_live: false,
            read_timeout_secs: default_read_timeout(),
            mutate_timeout_secs: default_mutate_timeout(),
            accept_routes: true,
        }
    }
}

/// Tailscale control-plane API settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiSettings {
    /// API access token; key management is disabled when absent.
    /// Never written back out when settings are serialized.
    #[serde(default, skip_serializing)]
    pub token: Option<SecretString>,

    /// Tailnet name, e.g. `example.com` or `user@github`
    #[serde(default)]
    pub tailnet: Option<String>,

    /// API base URL override
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Metrics sampler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerSettings {
    /// Enable the background sampler
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sampling interval in seconds
    #[serde(default = "default_sample_interval")]
    pub interval_secs: u64,
}

fn default_sample_interval() -> u64 {
    60
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_sample_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.tailscale.cache_ttl_secs, 5);
        assert_eq!(settings.tailscale.read_timeout_secs, 10);
        assert_eq!(settings.tailscale.mutate_timeout_secs, 30);
        assert!(settings.tailscale.accept_routes);
        assert!(!settings.tailscale.always_live);
        assert_eq!(settings.server.port, 8384);
        assert!(settings.api.token.is_none());
        assert!(settings.sampler.enabled);
    }
}
