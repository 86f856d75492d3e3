//! Auth-key API pass-through

use serde::{Deserialize, Serialize};

use crate::api::client::ApiClient;
use crate::errors::SentryError;

/// An auth key as reported by the coordination server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthKey {
    #[serde(default)]
    pub id: String,

    /// Secret key material; only present in the create response.
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub created: String,

    #[serde(default)]
    pub expires: String,

    #[serde(default)]
    pub revoked: bool,
}

#[derive(Debug, Deserialize)]
struct KeyListResponse {
    #[serde(default)]
    keys: Vec<AuthKey>,
}

/// Request body for creating an auth key.
#[derive(Debug, Clone, Serialize)]
pub struct CreateKeyRequest {
    pub description: String,

    #[serde(rename = "expirySeconds", skip_serializing_if = "Option::is_none")]
    pub expiry_seconds: Option<u64>,

    pub capabilities: KeyCapabilities,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyCapabilities {
    pub devices: KeyDeviceCapabilities,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyDeviceCapabilities {
    pub create: KeyCreateCapabilities,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyCreateCapabilities {
    pub reusable: bool,
    pub ephemeral: bool,
    pub preauthorized: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl CreateKeyRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            expiry_seconds: None,
            capabilities: KeyCapabilities {
                devices: KeyDeviceCapabilities {
                    create: KeyCreateCapabilities {
                        reusable: false,
                        ephemeral: false,
                        preauthorized: false,
                        tags: Vec::new(),
                    },
                },
            },
        }
    }
}

impl ApiClient {
    /// List auth keys for the tailnet.
    pub async fn list_keys(&self) -> Result<Vec<AuthKey>, SentryError> {
        let path = format!("/tailnet/{}/keys", self.tailnet());
        let response: KeyListResponse = self.get(&path).await?;
        Ok(response.keys)
    }

    /// Create a new auth key.
    pub async fn create_key(&self, request: &CreateKeyRequest) -> Result<AuthKey, SentryError> {
        let path = format!("/tailnet/{}/keys", self.tailnet());
        self.post(&path, request).await
    }

    /// Revoke an auth key.
    pub async fn revoke_key(&self, key_id: &str) -> Result<(), SentryError> {
        if key_id.is_empty() || !key_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SentryError::ValidationError(format!(
                "invalid key id: {:?}",
                key_id
            )));
        }
        let path = format!("/tailnet/{}/keys/{}", self.tailnet(), key_id);
        self.delete(&path).await
    }
}
