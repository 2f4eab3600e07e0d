//! Result reporting service
//!
//! Aggregates per-stage outcomes into the single pipeline verdict and owns
//! the forwarding of the coverage artifact to the external collector.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use gantry_client::CoverageMetadata;
use gantry_core::domain::run::{StageResult, Verdict};
use gantry_core::domain::secret::Secret;
use gantry_core::error::StageError;

use crate::repository::ArtifactSink;

/// Service trait for result aggregation and artifact forwarding
#[async_trait]
pub trait ReportService: Send + Sync {
    /// Computes the verdict from the recorded stage results
    ///
    /// Success iff every executed stage succeeded; the first failure names
    /// the verdict's stage. Cache-skipped stages count as neither.
    fn finalize(&self, stage_results: &[StageResult]) -> Verdict;

    /// Forwards a coverage artifact to the collector
    ///
    /// # Errors
    /// `StageError::ArtifactUploadFailed` when forwarding fails and the
    /// failure policy makes that fatal; a non-fatal failure is logged and
    /// swallowed.
    async fn forward_artifact(&self, report: &Path, token: &Secret) -> Result<(), StageError>;
}

/// Standard implementation of ReportService
pub struct StandardReportService {
    sink: Arc<dyn ArtifactSink>,
    metadata: CoverageMetadata,
    fail_on_upload_error: bool,
}

impl StandardReportService {
    /// Creates a reporter over the given sink
    ///
    /// # Arguments
    /// * `sink` - Collector adapter the artifact is forwarded to
    /// * `metadata` - Tags attached to every upload
    /// * `fail_on_upload_error` - Whether a forwarding failure fails the run
    pub fn new(
        sink: Arc<dyn ArtifactSink>,
        metadata: CoverageMetadata,
        fail_on_upload_error: bool,
    ) -> Self {
        Self {
            sink,
            metadata,
            fail_on_upload_error,
        }
    }
}

#[async_trait]
impl ReportService for StandardReportService {
    fn finalize(&self, stage_results: &[StageResult]) -> Verdict {
        match stage_results.iter().find(|r| r.is_failure()) {
            Some(failed) => Verdict::Failed {
                stage: failed.stage.clone(),
            },
            None => Verdict::Succeeded,
        }
    }

    async fn forward_artifact(&self, report: &Path, token: &Secret) -> Result<(), StageError> {
        match self.sink.upload(report, &self.metadata, token).await {
            Ok(()) => {
                info!("Coverage artifact {} forwarded", report.display());
                Ok(())
            }
            Err(e) if self.fail_on_upload_error => Err(StageError::ArtifactUploadFailed {
                reason: e.to_string(),
            }),
            Err(e) => {
                warn!("Coverage upload failed (non-fatal by config): {}", e);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::Mutex;

    struct FakeSink {
        fail: bool,
        uploads: Mutex<Vec<std::path::PathBuf>>,
    }

    impl FakeSink {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                uploads: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ArtifactSink for FakeSink {
        async fn upload(
            &self,
            report: &Path,
            _metadata: &CoverageMetadata,
            _token: &Secret,
        ) -> Result<()> {
            if self.fail {
                anyhow::bail!("collector rejected the report");
            }
            self.uploads.lock().unwrap().push(report.to_path_buf());
            Ok(())
        }
    }

    fn reporter(fail_upload: bool, fatal: bool) -> StandardReportService {
        StandardReportService::new(
            Arc::new(FakeSink::new(fail_upload)),
            CoverageMetadata::default(),
            fatal,
        )
    }

    #[test]
    fn test_finalize_success_when_all_succeed() {
        let reporter = reporter(false, true);
        let results = vec![
            StageResult::succeeded("checkout"),
            StageResult::skipped("install"),
            StageResult::succeeded("test"),
        ];
        assert_eq!(reporter.finalize(&results), Verdict::Succeeded);
    }

    #[test]
    fn test_finalize_names_first_failure() {
        let reporter = reporter(false, true);
        let results = vec![
            StageResult::succeeded("checkout"),
            StageResult::failed("test", "exit status 1"),
        ];
        assert_eq!(
            reporter.finalize(&results),
            Verdict::Failed {
                stage: "test".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_upload_failure_is_fatal_by_default() {
        let reporter = reporter(true, true);
        let token = Secret::new("COVERAGE_TOKEN", "t");

        let err = reporter
            .forward_artifact(Path::new("coverage.xml"), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::ArtifactUploadFailed { .. }));
    }

    #[tokio::test]
    async fn test_upload_failure_can_be_non_fatal() {
        let reporter = reporter(true, false);
        let token = Secret::new("COVERAGE_TOKEN", "t");

        assert!(
            reporter
                .forward_artifact(Path::new("coverage.xml"), &token)
                .await
                .is_ok()
        );
    }
}
