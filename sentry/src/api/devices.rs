//! Device API pass-through

use serde::{Deserialize, Serialize};

use crate::api::client::ApiClient;
use crate::errors::SentryError;

/// A device as reported by the coordination server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDevice {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub hostname: String,

    #[serde(default)]
    pub addresses: Vec<String>,

    #[serde(default)]
    pub os: String,

    #[serde(default, rename = "clientVersion")]
    pub client_version: String,

    #[serde(default, rename = "lastSeen")]
    pub last_seen: String,

    #[serde(default)]
    pub authorized: bool,

    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceListResponse {
    #[serde(default)]
    devices: Vec<ApiDevice>,
}

impl ApiClient {
    /// List all devices in the tailnet.
    pub async fn list_devices(&self) -> Result<Vec<ApiDevice>, SentryError> {
        let path = format!("/tailnet/{}/devices", self.tailnet());
        let response: DeviceListResponse = self.get(&path).await?;
        Ok(response.devices)
    }

    /// Remove a device from the tailnet.
    pub async fn delete_device(&self, device_id: &str) -> Result<(), SentryError> {
        if device_id.is_empty() || !device_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SentryError::ValidationError(format!(
                "invalid device id: {:?}",
                device_id
            )));
        }
        let path = format!("/device/{}", device_id);
        self.delete(&path).await
    }
}
