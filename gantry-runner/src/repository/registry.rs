//! Package registry adapter

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use gantry_client::RegistryClient;
use gantry_core::domain::secret::Secret;

/// Repository trait for the package registry
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Publishes a built package, authenticated by the publish token
    async fn publish(&self, package: &Path, token: &Secret) -> Result<()>;
}

/// HTTP implementation of PackageRegistry
pub struct HttpPackageRegistry {
    client: RegistryClient,
}

impl HttpPackageRegistry {
    /// Creates a registry adapter
    ///
    /// # Arguments
    /// * `registry_url` - Base URL of the registry
    /// * `username` - Account name the token belongs to
    pub fn new(registry_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            client: RegistryClient::new(registry_url, username),
        }
    }
}

#[async_trait]
impl PackageRegistry for HttpPackageRegistry {
    async fn publish(&self, package: &Path, token: &Secret) -> Result<()> {
        self.client
            .publish(package, token)
            .await
            .context("Failed to publish package")
    }
}
