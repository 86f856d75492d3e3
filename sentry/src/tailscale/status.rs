//! Typed model of `tailscale status --json`

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::SentryError;

/// Sentinel routes a device advertises when acting as an exit node.
pub const EXIT_NODE_ROUTES: [&str; 2] = ["0.0.0.0/0", "::/0"];

/// Capability flags reported per node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(rename = "ExitNode", default)]
    pub exit_node: bool,

    #[serde(rename = "SubnetRouter", default)]
    pub subnet_router: bool,
}

/// One node (self or peer) as reported by the status JSON.
///
/// Every field defaults when absent; the upstream document omits fields
/// freely between versions and a partial node must never fail the parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(rename = "HostName", default)]
    pub host_name: String,

    #[serde(rename = "TailscaleIPs", default)]
    pub tailscale_ips: Vec<String>,

    #[serde(rename = "OS", default)]
    pub os: String,

    #[serde(rename = "Online", default)]
    pub online: bool,

    #[serde(rename = "LastSeen", default)]
    pub last_seen: String,

    #[serde(rename = "TXBytes", default)]
    pub tx_bytes: u64,

    #[serde(rename = "RXBytes", default)]
    pub rx_bytes: u64,

    #[serde(rename = "AdvertisedRoutes", default)]
    pub advertised_routes: Vec<String>,

    #[serde(rename = "ClientVersion", default)]
    pub client_version: String,

    #[serde(rename = "Capabilities", default)]
    pub capabilities: Capabilities,

    /// True on the peer currently used as this device's exit node.
    #[serde(rename = "ExitNode", default)]
    pub exit_node: bool,

    /// True on peers offering themselves as exit nodes.
    #[serde(rename = "ExitNodeOption", default)]
    pub exit_node_option: bool,

    #[serde(rename = "Tags", default)]
    pub tags: Vec<String>,
}

impl NodeInfo {
    /// First Tailscale IP, empty when the node reported none.
    pub fn primary_ip(&self) -> &str {
        self.tailscale_ips.first().map(String::as_str).unwrap_or("")
    }

    /// Advertised routes with the exit-node sentinels removed.
    pub fn subnet_routes(&self) -> Vec<String> {
        self.advertised_routes
            .iter()
            .filter(|r| !EXIT_NODE_ROUTES.contains(&r.as_str()))
            .cloned()
            .collect()
    }

    /// Whether the node currently advertises the exit-node sentinels.
    pub fn advertises_exit_node(&self) -> bool {
        self.advertised_routes
            .iter()
            .any(|r| EXIT_NODE_ROUTES.contains(&r.as_str()))
            || self.capabilities.exit_node
    }
}

/// Raw shape of the status document.
#[derive(Debug, Clone, Default, Deserialize)]
struct StatusDoc {
    #[serde(rename = "Self", default)]
    self_node: NodeInfo,

    #[serde(rename = "Peer", default)]
    peers: HashMap<String, NodeInfo>,
}

/// Parsed snapshot of `tailscale status --json`.
///
/// Self node and peer map always come from the same JSON document; a
/// snapshot is immutable once built and replaced wholesale on refresh.
#[derive(Debug, Clone, Default)]
pub struct DeviceStatus {
    pub self_node: NodeInfo,
    pub peers: HashMap<String, NodeInfo>,
}

impl DeviceStatus {
    /// Parse one status document.
    pub fn parse(json: &str) -> Result<Self, SentryError> {
        let doc: StatusDoc = serde_json::from_str(json)
            .map_err(|e| SentryError::ParseError(format!("status --json: {}", e)))?;
        Ok(Self {
            self_node: doc.self_node,
            peers: doc.peers,
        })
    }

    /// The peer currently in use as this device's exit node, if any.
    pub fn active_exit_node(&self) -> Option<PeerSummary> {
        self.peers
            .values()
            .find(|p| p.exit_node)
            .map(PeerSummary::from_node)
    }

    /// True when any peer offers itself as an exit node.
    pub fn has_exit_node_offer(&self) -> bool {
        self.peers.values().any(|p| p.exit_node_option)
    }

    /// Total traffic counters across self and all peers.
    pub fn traffic_totals(&self) -> (u64, u64) {
        let mut tx = self.self_node.tx_bytes;
        let mut rx = self.self_node.rx_bytes;
        for peer in self.peers.values() {
            tx += peer.tx_bytes;
            rx += peer.rx_bytes;
        }
        (tx, rx)
    }

    /// Number of peers reported online.
    pub fn online_peers(&self) -> usize {
        self.peers.values().filter(|p| p.online).count()
    }
}

/// Condensed peer view returned by derived queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSummary {
    pub host_name: String,
    pub ip: String,
    pub os: String,
    pub online: bool,
    pub client_version: String,
}

impl PeerSummary {
    fn from_node(node: &NodeInfo) -> Self {
        Self {
            host_name: node.host_name.clone(),
            ip: node.primary_ip().to_string(),
            os: node.os.clone(),
            online: node.online,
            client_version: node.client_version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_document() {
        let status = DeviceStatus::parse(r#"{"Self":{"HostName":"h1"},"Peer":{}}"#).unwrap();
        assert_eq!(status.self_node.host_name, "h1");
        assert!(status.peers.is_empty());
        assert!(!status.self_node.online);
    }

    #[test]
    fn test_parse_missing_fields_default() {
        let status = DeviceStatus::parse(r#"{"Self":{},"Peer":{"k":{}}}"#).unwrap();
        assert_eq!(status.self_node.primary_ip(), "");
        assert_eq!(status.peers.len(), 1);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            DeviceStatus::parse("not json"),
            Err(SentryError::ParseError(_))
        ));
    }

    #[test]
    fn test_subnet_routes_exclude_sentinels() {
        let node = NodeInfo {
            advertised_routes: vec![
                "0.0.0.0/0".to_string(),
                "::/0".to_string(),
                "10.0.0.0/24".to_string(),
            ],
            ..Default::default()
        };
        assert_eq!(node.subnet_routes(), vec!["10.0.0.0/24"]);
        assert!(node.advertises_exit_node());
    }

    #[test]
    fn test_active_exit_node() {
        let json = r#"{
            "Self": {"HostName": "h1", "TailscaleIPs": ["100.64.0.1"]},
            "Peer": {
                "a": {"HostName": "h2", "TailscaleIPs": ["100.64.0.2"], "ExitNode": true},
                "b": {"HostName": "h3", "TailscaleIPs": ["100.64.0.3"]}
            }
        }"#;
        let status = DeviceStatus::parse(json).unwrap();
        let exit = status.active_exit_node().unwrap();
        assert_eq!(exit.host_name, "h2");
        assert_eq!(exit.ip, "100.64.0.2");
    }
}
