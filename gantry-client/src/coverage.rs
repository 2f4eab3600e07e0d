//! Coverage collector client

use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{ClientError, Result};
use gantry_core::domain::secret::Secret;

/// Metadata tags attached to a coverage upload
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageMetadata {
    /// Report flags (e.g. "unittests")
    pub flags: Vec<String>,
    /// Environment variables the collector should record
    pub env: HashMap<String, String>,
    /// Display name for the upload
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    #[serde(flatten)]
    metadata: &'a CoverageMetadata,
    report: String,
}

/// HTTP client for the coverage collector
#[derive(Debug, Clone)]
pub struct CoverageClient {
    base_url: String,
    client: Client,
}

impl CoverageClient {
    /// Create a new coverage collector client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the collector (e.g., "https://collector.example.com")
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Get the base URL of the collector
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Uploads a coverage report
    ///
    /// Reads the report from disk and posts it with its metadata tags,
    /// authenticated by the upload token. Any non-success status is an
    /// error; the caller decides whether that fails the pipeline.
    ///
    /// # Arguments
    /// * `report_path` - Path to the coverage report file
    /// * `metadata` - Flags, environment tags, and name for the upload
    /// * `token` - The coverage-upload token
    pub async fn upload(
        &self,
        report_path: &Path,
        metadata: &CoverageMetadata,
        token: &Secret,
    ) -> Result<()> {
        let report = tokio::fs::read_to_string(report_path).await.map_err(|e| {
            ClientError::PayloadError(format!(
                "failed to read coverage report {}: {}",
                report_path.display(),
                e
            ))
        })?;

        debug!(
            "Uploading coverage report {} ({} bytes)",
            report_path.display(),
            report.len()
        );

        let url = format!("{}/upload/v4", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose())
            .json(&UploadRequest {
                metadata,
                report,
            })
            .send()
            .await?;

        crate::check_response(response).await
    }
}
