//! Utility functions

use serde::{Deserialize, Serialize};

/// Version information for the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Hostname of the local machine, used when neither the caller nor the
/// cached tailscale state names one.
pub fn local_hostname() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "tailsentry".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info_populated() {
        let info = version_info();
        assert!(!info.version.is_empty());
    }

    #[test]
    fn test_local_hostname_nonempty() {
        assert!(!local_hostname().is_empty());
    }
}
