//! Tailscale control-plane API client.
//!
//! Pure pass-through: keys and devices live on the coordination server and
//! no authoritative copy is held locally.

use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::SentryError;
use crate::storage::settings::ApiSettings;

const DEFAULT_BASE_URL: &str = "https://api.tailscale.com/api/v2";

/// HTTP client for the Tailscale API
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: SecretString,
    tailnet: String,
}

impl ApiClient {
    /// Build a client from settings. Errors when no token or tailnet is
    /// configured, which callers treat as "API features disabled".
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, SentryError> {
        let token = settings
            .token
            .clone()
            .ok_or_else(|| SentryError::ConfigError("no API token configured".to_string()))?;
        let tailnet = settings
            .tailnet
            .clone()
            .ok_or_else(|| SentryError::ConfigError("no tailnet configured".to_string()))?;
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            tailnet,
        })
    }

    /// The configured tailnet name.
    pub fn tailnet(&self) -> &str {
        &self.tailnet
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SentryError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .send()
            .await?;

        Self::check(response).await?.json().await.map_err(Into::into)
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SentryError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .json(body)
            .send()
            .await?;

        Self::check(response).await?.json().await.map_err(Into::into)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), SentryError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SentryError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("API request failed: {} - {}", status, body);
        Err(SentryError::ApiError(format!("{}: {}", status, body)))
    }
}
