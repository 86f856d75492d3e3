//! Tailscale binary discovery

use std::path::Path;

use tracing::debug;

/// Well-known install locations checked before falling back to PATH.
#[cfg(target_os = "linux")]
const WELL_KNOWN_PATHS: &[&str] = &[
    "/usr/bin/tailscale",
    "/usr/sbin/tailscale",
    "/usr/local/bin/tailscale",
    "/snap/bin/tailscale",
];

#[cfg(target_os = "macos")]
const WELL_KNOWN_PATHS: &[&str] = &[
    "/usr/local/bin/tailscale",
    "/opt/homebrew/bin/tailscale",
    "/Applications/Tailscale.app/Contents/MacOS/Tailscale",
];

#[cfg(target_os = "windows")]
const WELL_KNOWN_PATHS: &[&str] = &[
    "C:\\Program Files\\Tailscale\\tailscale.exe",
    "C:\\Program Files (x86)\\Tailscale\\tailscale.exe",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const WELL_KNOWN_PATHS: &[&str] = &["/usr/local/bin/tailscale"];

#[cfg(windows)]
const BARE_NAME: &str = "tailscale.exe";

#[cfg(not(windows))]
const BARE_NAME: &str = "tailscale";

/// Locate the tailscale binary.
///
/// Checks platform install paths, then each PATH entry, then degrades to the
/// bare command name so a missing binary surfaces as a diagnosable invocation
/// error rather than a discovery failure.
pub fn resolve_binary_path() -> String {
    for candidate in WELL_KNOWN_PATHS {
        if Path::new(candidate).is_file() {
            debug!(path = %candidate, "Found tailscale at well-known path");
            return candidate.to_string();
        }
    }

    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            let candidate = dir.join(BARE_NAME);
            if candidate.is_file() {
                debug!(path = %candidate.display(), "Found tailscale on PATH");
                return candidate.to_string_lossy().to_string();
            }
        }
    }

    debug!("tailscale not found, falling back to bare command name");
    BARE_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_never_empty() {
        let path = resolve_binary_path();
        assert!(!path.is_empty());
        assert!(path.contains("tailscale"));
    }
}
