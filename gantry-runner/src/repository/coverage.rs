//! Coverage collector adapter

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use gantry_client::{CoverageClient, CoverageMetadata};
use gantry_core::domain::secret::Secret;

/// Repository trait for the coverage collector
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Forwards a coverage report, authenticated by the upload token
    async fn upload(
        &self,
        report: &Path,
        metadata: &CoverageMetadata,
        token: &Secret,
    ) -> Result<()>;
}

/// HTTP implementation of ArtifactSink
pub struct HttpArtifactSink {
    client: CoverageClient,
}

impl HttpArtifactSink {
    /// Creates a sink targeting the given collector
    pub fn new(collector_url: impl Into<String>) -> Self {
        Self {
            client: CoverageClient::new(collector_url),
        }
    }
}

#[async_trait]
impl ArtifactSink for HttpArtifactSink {
    async fn upload(
        &self,
        report: &Path,
        metadata: &CoverageMetadata,
        token: &Secret,
    ) -> Result<()> {
        self.client
            .upload(report, metadata, token)
            .await
            .context("Failed to upload coverage report")
    }
}
