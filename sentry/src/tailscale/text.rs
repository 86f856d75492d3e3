//! Fallback parser for the human-readable `tailscale status` table.
//!
//! Best-effort by nature: the upstream text format is unstructured and the
//! substring heuristics below are not authoritative. Whenever a JSON sample
//! covering the same host is available, its explicit flags win.

use serde::{Deserialize, Serialize};

use crate::tailscale::status::DeviceStatus;

/// OS tokens the status table is known to emit.
const KNOWN_OS: &[&str] = &[
    "linux", "macos", "windows", "ios", "android", "freebsd", "openbsd", "tvos",
];

/// A device row parsed from the status table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub ip: String,
    pub hostname: String,
    pub user: String,
    pub os: String,
    pub online: bool,

    /// Device offers itself as an exit node.
    pub is_exit_node: bool,

    /// Device is currently routing through an exit node.
    pub uses_exit_node: bool,

    pub is_subnet_router: bool,
    pub tagged: bool,

    /// Raw free-text status column, kept for display.
    pub status_text: String,
}

/// Parse the plain-text status table into device rows.
pub fn parse_status_text(output: &str) -> Vec<Device> {
    let mut devices = Vec::new();

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.contains("Health check") {
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() < 4 {
            continue;
        }

        let ip = tokens[0].to_string();
        let hostname = tokens[1].to_string();
        let user = tokens[2].to_string();

        // The fourth column is the OS; trust the position even when the
        // token is not in the known set.
        let os_token = tokens[3];
        let os = KNOWN_OS
            .iter()
            .find(|known| os_token.eq_ignore_ascii_case(known))
            .map(|known| known.to_string())
            .unwrap_or_else(|| os_token.to_string());

        let status_text = tokens[4..].join(" ").to_lowercase();

        let online = status_text.contains("active") || status_text.contains("idle");
        let is_exit_node = status_text.contains("offers exit node");
        let uses_exit_node = status_text.contains("exit node") && !is_exit_node;
        let is_subnet_router = status_text.contains("subnet router");
        let tagged = status_text.contains("tagged") || hostname.contains('@');

        devices.push(Device {
            ip,
            hostname,
            user,
            os,
            online,
            is_exit_node,
            uses_exit_node,
            is_subnet_router,
            tagged,
            status_text,
        });
    }

    devices
}

/// Override text-derived online flags with the explicit booleans from a JSON
/// status covering the same hosts. Text heuristics are last-resort only.
pub fn annotate_online_from(devices: &mut [Device], status: &DeviceStatus) {
    for device in devices.iter_mut() {
        let node = std::iter::once(&status.self_node)
            .chain(status.peers.values())
            .find(|n| {
                n.tailscale_ips.iter().any(|ip| ip == &device.ip)
                    || (!n.host_name.is_empty() && n.host_name == device.hostname)
            });

        if let Some(node) = node {
            device.online = node.online;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Health check:
#     - not logged in to an account

100.64.0.1   laptop     alice@   linux   idle; tx 1234 rx 5678
100.64.0.2   nas        bob@     linux   offline
100.64.0.3   gateway    carol@   linux   active; offers exit node; subnet router
";

    #[test]
    fn test_parse_sample_table() {
        let devices = parse_status_text(SAMPLE);
        assert_eq!(devices.len(), 3);

        assert!(devices[0].online);
        assert!(!devices[1].online);
        assert!(devices[2].online);

        let exit_nodes: Vec<_> = devices.iter().filter(|d| d.is_exit_node).collect();
        assert_eq!(exit_nodes.len(), 1);
        assert_eq!(exit_nodes[0].hostname, "gateway");
        assert!(exit_nodes[0].is_subnet_router);
    }

    #[test]
    fn test_uses_vs_offers_exit_node() {
        let devices =
            parse_status_text("100.64.0.9 roamer dave@ macos active; exit node; direct");
        assert_eq!(devices.len(), 1);
        assert!(devices[0].uses_exit_node);
        assert!(!devices[0].is_exit_node);
    }

    #[test]
    fn test_unknown_os_token_kept() {
        let devices = parse_status_text("100.64.0.8 box eve@ plan9 idle");
        assert_eq!(devices[0].os, "plan9");
    }

    #[test]
    fn test_json_online_overrides_text() {
        let mut devices = parse_status_text("100.64.0.1 laptop alice@ linux idle");
        assert!(devices[0].online);

        let status = DeviceStatus::parse(
            r#"{"Self":{"HostName":"laptop","TailscaleIPs":["100.64.0.1"],"Online":false},"Peer":{}}"#,
        )
        .unwrap();
        annotate_online_from(&mut devices, &status);
        assert!(!devices[0].online);
    }
}
