//! Error taxonomy for pipeline execution

use thiserror::Error;

/// Errors that can fail a single stage
///
/// Any of these halts the pipeline at the stage that raised it; the run's
/// verdict names that stage. Cache-store trouble is deliberately absent:
/// an unreachable cache store is downgraded to a forced miss, never a
/// stage failure.
#[derive(Debug, Error)]
pub enum StageError {
    /// A required secret could not be resolved; the stage fails closed
    /// without attempting the external call
    #[error("credential '{name}' not found")]
    CredentialNotFound { name: String },

    /// An invocation exited with a non-success status
    #[error("step '{program}' exited with status {exit_code}")]
    CommandFailed { program: String, exit_code: i32 },

    /// The step's process could not be started at all
    #[error("failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    /// The step exceeded the configured stage timeout
    #[error("step '{program}' timed out after {seconds}s")]
    TimedOut { program: String, seconds: u64 },

    /// The stage was expected to produce an artifact that does not exist
    #[error("expected artifact '{path}' was not produced")]
    ArtifactMissing { path: String },

    /// Forwarding an artifact to the external collector failed
    #[error("artifact upload failed: {reason}")]
    ArtifactUploadFailed { reason: String },

    /// Publishing the package to the registry failed
    #[error("package publish failed: {reason}")]
    PublishFailed { reason: String },
}

impl StageError {
    /// Check if this error is a missing-credential failure
    pub fn is_credential_not_found(&self) -> bool {
        matches!(self, Self::CredentialNotFound { .. })
    }
}
