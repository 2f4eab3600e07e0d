//! Pipeline run results

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::log::LogEntry;

/// Outcome of a single executed stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Succeeded,
    Failed,
    /// Skipped by a cache hit; stages aborted by a prior failure produce
    /// no result at all
    Skipped,
}

/// Result of one stage
///
/// Created when the stage finishes; immutable afterwards. Never carries
/// secret values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: String,
    pub status: StageStatus,
    pub error_message: Option<String>,
    /// Artifact the stage produced, if any (e.g. a coverage report)
    pub artifact: Option<PathBuf>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl StageResult {
    pub fn succeeded(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Succeeded,
            error_message: None,
            artifact: None,
            completed_at: chrono::Utc::now(),
        }
    }

    pub fn failed(stage: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Failed,
            error_message: Some(error_message.into()),
            artifact: None,
            completed_at: chrono::Utc::now(),
        }
    }

    pub fn skipped(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Skipped,
            error_message: None,
            artifact: None,
            completed_at: chrono::Utc::now(),
        }
    }

    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.artifact = Some(path);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == StageStatus::Failed
    }
}

/// Overall verdict of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum Verdict {
    /// Every executed stage succeeded
    Succeeded,
    /// Halted at the named stage; later stages never ran
    Failed { stage: String },
    /// Suppressed by the trigger; not an error
    Skipped,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Succeeded)
    }
}

/// Aggregated result of one pipeline instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub pipeline: String,
    pub verdict: Verdict,
    /// Results for stages that executed or were cache-skipped, in order
    pub stage_results: Vec<StageResult>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub logs: Vec<LogEntry>,
}

impl PipelineResult {
    /// Looks up the result of a named stage
    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stage_results.iter().find(|r| r.stage == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_carries_message() {
        let result = StageResult::failed("test", "exit status 1");
        assert!(result.is_failure());
        assert_eq!(result.error_message.as_deref(), Some("exit status 1"));
    }

    #[test]
    fn test_verdict_success() {
        assert!(Verdict::Succeeded.is_success());
        assert!(
            !Verdict::Failed {
                stage: "test".to_string()
            }
            .is_success()
        );
        assert!(!Verdict::Skipped.is_success());
    }
}
