//! Package registry client

use reqwest::Client;
use std::path::Path;
use tracing::debug;

use crate::error::{ClientError, Result};
use gantry_core::domain::secret::Secret;

/// HTTP client for the package registry
///
/// Publishes a built package archive under a username/token pair. The
/// registry either accepts the package or rejects it; there is no partial
/// success.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: String,
    username: String,
    client: Client,
}

impl RegistryClient {
    /// Create a new registry client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the registry
    /// * `username` - Account name the token belongs to (e.g., "__token__")
    pub fn new(base_url: impl Into<String>, username: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            client: Client::new(),
        }
    }

    /// Get the base URL of the registry
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Publishes a built package
    ///
    /// # Arguments
    /// * `package_path` - Path to the built package archive
    /// * `token` - The registry publish token
    pub async fn publish(&self, package_path: &Path, token: &Secret) -> Result<()> {
        let package = tokio::fs::read(package_path).await.map_err(|e| {
            ClientError::PayloadError(format!(
                "failed to read package {}: {}",
                package_path.display(),
                e
            ))
        })?;

        debug!(
            "Publishing package {} ({} bytes)",
            package_path.display(),
            package.len()
        );

        let url = format!("{}/api/packages/upload", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(token.expose()))
            .body(package)
            .send()
            .await?;

        crate::check_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = RegistryClient::new("https://registry.example.com/", "__token__");
        assert_eq!(client.base_url(), "https://registry.example.com");
    }
}
