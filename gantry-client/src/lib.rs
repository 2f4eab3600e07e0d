//! Gantry collaborator clients
//!
//! Type-safe HTTP clients for the two outward collaborators of a pipeline
//! run: the coverage collector and the package registry. Both are thin
//! wrappers over their upload endpoints; pass/fail is the only structured
//! outcome either one reports.
//!
//! # Example
//!
//! ```no_run
//! use gantry_client::{CoverageClient, CoverageMetadata};
//! use gantry_core::domain::secret::Secret;
//!
//! #[tokio::main]
//! async fn main() -> gantry_client::Result<()> {
//!     let client = CoverageClient::new("https://collector.example.com");
//!     let token = Secret::new("COVERAGE_TOKEN", "t0ken");
//!     client
//!         .upload("coverage.xml".as_ref(), &CoverageMetadata::default(), &token)
//!         .await?;
//!     Ok(())
//! }
//! ```

mod coverage;
pub mod error;
mod registry;

// Re-export commonly used types
pub use coverage::{CoverageClient, CoverageMetadata};
pub use error::{ClientError, Result};
pub use registry::RegistryClient;

/// Checks a collaborator response, turning non-success statuses into
/// [`ClientError::ApiError`] with the response body as the message.
pub(crate) async fn check_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}
