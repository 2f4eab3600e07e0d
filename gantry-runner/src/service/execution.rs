//! Execution service
//!
//! Runs one pipeline instance end to end:
//! - Consults the trigger before anything else runs
//! - Executes stages strictly in declared order, fail-fast
//! - Skips cache-gated stages on a hit, stores the populated directory
//!   after an install that ran on a miss
//! - Resolves each stage's declared secrets just-in-time and drops them
//!   when the stage completes
//!
//! This service contains the core orchestration logic; everything it calls
//! out to sits behind a repository or invoker trait.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use gantry_core::domain::cache::CacheEntry;
use gantry_core::domain::event::Event;
use gantry_core::domain::pipeline::{PipelineDefinition, Stage, StageKind};
use gantry_core::domain::run::{PipelineResult, StageResult, Verdict};
use gantry_core::domain::secret::{COVERAGE_TOKEN, REGISTRY_TOKEN, Secret};
use gantry_core::error::StageError;

use crate::config::Config;
use crate::context::RunContext;
use crate::invoke::CommandInvoker;
use crate::repository::PackageRegistry;
use crate::service::{CacheService, ReportService, SecretBroker};

/// Per-run inputs supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    /// Dependency lock-file contents keying the cache; `None` means no
    /// cache gating (cache-gated stages simply run)
    pub lock_file_contents: Option<Vec<u8>>,
}

impl RunInputs {
    pub fn with_lock_file(contents: Vec<u8>) -> Self {
        Self {
            lock_file_contents: Some(contents),
        }
    }
}

/// Service trait for executing pipeline instances
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Executes one pipeline instance for the given event
    ///
    /// # Returns
    /// The aggregated result: verdict, per-stage results in order, and the
    /// run's log. A trigger skip yields `Verdict::Skipped` with no stage
    /// results.
    async fn execute(
        &self,
        definition: &PipelineDefinition,
        event: &Event,
        inputs: &RunInputs,
    ) -> Result<PipelineResult>;
}

/// Standard implementation of ExecutionService
pub struct StandardExecutionService {
    config: Config,
    invoker: Arc<dyn CommandInvoker>,
    cache: Arc<dyn CacheService>,
    secrets: Arc<dyn SecretBroker>,
    reporter: Arc<dyn ReportService>,
    registry: Arc<dyn PackageRegistry>,
}

impl StandardExecutionService {
    /// Creates a new standard execution service
    pub fn new(
        config: Config,
        invoker: Arc<dyn CommandInvoker>,
        cache: Arc<dyn CacheService>,
        secrets: Arc<dyn SecretBroker>,
        reporter: Arc<dyn ReportService>,
        registry: Arc<dyn PackageRegistry>,
    ) -> Self {
        Self {
            config,
            invoker,
            cache,
            secrets,
            reporter,
            registry,
        }
    }

    /// Executes a single stage
    ///
    /// Secrets live only for this call: the resolved map is dropped when
    /// the stage returns, and nothing here logs a secret value.
    async fn run_stage(
        &self,
        stage: &Stage,
        ctx: &RunContext,
        produced_artifact: &mut Option<PathBuf>,
    ) -> Result<StageResult, StageError> {
        let secrets = self.secrets.resolve_all(&stage.secrets).await?;

        match stage.kind {
            StageKind::Command => {
                let env: HashMap<String, String> = secrets
                    .iter()
                    .map(|(name, secret)| (name.clone(), secret.expose().to_string()))
                    .collect();

                for step in &stage.steps {
                    let output = self
                        .invoker
                        .invoke(step, &ctx.workspace, &env, self.config.stage_timeout)
                        .await?;

                    if !output.success() {
                        return Err(StageError::CommandFailed {
                            program: step.program.clone(),
                            exit_code: output.exit_code,
                        });
                    }
                }

                let mut result = StageResult::succeeded(&stage.name);
                if let Some(rel) = &stage.artifact {
                    let path = ctx.workspace.join(rel);
                    *produced_artifact = Some(path.clone());
                    result = result.with_artifact(path);
                }
                Ok(result)
            }
            StageKind::CoverageUpload => {
                let token = Self::declared_secret(&secrets, COVERAGE_TOKEN)?;
                let report = produced_artifact
                    .clone()
                    .or_else(|| stage.artifact.as_ref().map(|rel| ctx.workspace.join(rel)))
                    .ok_or_else(|| StageError::ArtifactMissing {
                        path: "coverage report".to_string(),
                    })?;

                self.reporter.forward_artifact(&report, token).await?;
                Ok(StageResult::succeeded(&stage.name).with_artifact(report))
            }
            StageKind::PublishPackage => {
                let token = Self::declared_secret(&secrets, REGISTRY_TOKEN)?;
                let package = stage
                    .artifact
                    .as_ref()
                    .map(|rel| ctx.workspace.join(rel))
                    .or_else(|| produced_artifact.clone())
                    .ok_or_else(|| StageError::ArtifactMissing {
                        path: "package archive".to_string(),
                    })?;

                self.registry
                    .publish(&package, token)
                    .await
                    .map_err(|e| StageError::PublishFailed {
                        reason: e.to_string(),
                    })?;
                Ok(StageResult::succeeded(&stage.name))
            }
        }
    }

    /// Fetches a secret the stage declared; undeclared names fail closed
    fn declared_secret<'a>(
        secrets: &'a HashMap<String, Secret>,
        name: &str,
    ) -> Result<&'a Secret, StageError> {
        secrets
            .get(name)
            .ok_or_else(|| StageError::CredentialNotFound {
                name: name.to_string(),
            })
    }

    /// Best-effort coverage upload after a failed run
    ///
    /// Only reached when `upload_after_failure` is configured. The token
    /// comes from the pending upload stage's own declared secrets, the
    /// same scope it would have had running normally. Never changes the
    /// verdict.
    async fn upload_after_failure(
        &self,
        definition: &PipelineDefinition,
        results: &[StageResult],
        produced_artifact: &Option<PathBuf>,
        ctx: &RunContext,
    ) {
        let Some(report) = produced_artifact else {
            return;
        };

        let Some(pending) = definition.stages.iter().find(|s| {
            s.kind == StageKind::CoverageUpload && !results.iter().any(|r| r.stage == s.name)
        }) else {
            return;
        };

        let secrets = match self.secrets.resolve_all(&pending.secrets).await {
            Ok(secrets) => secrets,
            Err(e) => {
                warn!("Best-effort coverage upload skipped: {}", e);
                ctx.log_warning(format!("Best-effort coverage upload skipped: {}", e));
                return;
            }
        };

        match Self::declared_secret(&secrets, COVERAGE_TOKEN) {
            Ok(token) => match self.reporter.forward_artifact(report, token).await {
                Ok(()) => ctx.log_info("Best-effort coverage upload completed".to_string()),
                Err(e) => {
                    warn!("Best-effort coverage upload failed: {}", e);
                    ctx.log_warning(format!("Best-effort coverage upload failed: {}", e));
                }
            },
            Err(e) => {
                warn!("Best-effort coverage upload skipped: {}", e);
                ctx.log_warning(format!("Best-effort coverage upload skipped: {}", e));
            }
        }
    }
}

#[async_trait]
impl ExecutionService for StandardExecutionService {
    async fn execute(
        &self,
        definition: &PipelineDefinition,
        event: &Event,
        inputs: &RunInputs,
    ) -> Result<PipelineResult> {
        let started_at = chrono::Utc::now();
        let ctx = RunContext::new(&definition.name, self.config.workspace.clone());

        info!(
            "Starting run {} of pipeline '{}'",
            ctx.run_id, definition.name
        );

        if !definition.trigger.should_run(event) {
            info!("Pipeline '{}' suppressed by trigger", definition.name);
            ctx.log_info(format!(
                "Run suppressed by skip marker '{}'",
                definition.trigger.skip_marker
            ));
            return Ok(PipelineResult {
                run_id: ctx.run_id,
                pipeline: ctx.pipeline.clone(),
                verdict: Verdict::Skipped,
                stage_results: Vec::new(),
                started_at,
                finished_at: chrono::Utc::now(),
                logs: ctx.drain_logs(),
            });
        }

        let mut cache_entry: Option<CacheEntry> = None;
        let mut results: Vec<StageResult> = Vec::new();
        let mut produced_artifact: Option<PathBuf> = None;
        let mut halted = false;

        for (idx, stage) in definition.stages.iter().enumerate() {
            if stage.depends_on_cache {
                // Resolved at the point the caching stage executes, once
                // per run.
                if cache_entry.is_none() {
                    if let Some(contents) = &inputs.lock_file_contents {
                        cache_entry = Some(self.cache.resolve(contents).await);
                    }
                }

                if let Some(entry) = &cache_entry {
                    if entry.hit {
                        info!(
                            "Stage '{}' skipped: cache hit for key {}",
                            stage.name, entry.key
                        );
                        ctx.log_info(format!("Stage '{}' skipped (cache hit)", stage.name));
                        results.push(StageResult::skipped(&stage.name));
                        continue;
                    }
                }
            }

            info!(
                "Executing stage {}/{}: {}",
                idx + 1,
                definition.stages.len(),
                stage.name
            );
            ctx.log_info(format!("Starting stage: {}", stage.name));

            match self.run_stage(stage, &ctx, &mut produced_artifact).await {
                Ok(result) => {
                    if stage.depends_on_cache {
                        if let Some(entry) = &cache_entry {
                            // Write-through: future runs with the same lock
                            // file hit this key.
                            let path = self.config.workspace.join(&self.config.cache_path);
                            self.cache.store(&entry.key, &path).await;
                        }
                    }

                    ctx.log_info(format!("Stage '{}' completed", stage.name));
                    results.push(result);
                }
                Err(e) => {
                    error!("Stage '{}' failed: {}", stage.name, e);
                    ctx.log_error(format!("Stage '{}' failed: {}", stage.name, e));
                    results.push(StageResult::failed(&stage.name, e.to_string()));
                    halted = true;
                    break;
                }
            }
        }

        if halted && self.config.upload_after_failure {
            self.upload_after_failure(definition, &results, &produced_artifact, &ctx)
                .await;
        }

        let verdict = self.reporter.finalize(&results);
        match &verdict {
            Verdict::Succeeded => info!("Pipeline '{}' succeeded", definition.name),
            Verdict::Failed { stage } => {
                error!("Pipeline '{}' failed at stage '{}'", definition.name, stage)
            }
            Verdict::Skipped => {}
        }

        Ok(PipelineResult {
            run_id: ctx.run_id,
            pipeline: ctx.pipeline.clone(),
            verdict,
            stage_results: results,
            started_at,
            finished_at: chrono::Utc::now(),
            logs: ctx.drain_logs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::StepOutput;
    use crate::pipelines;
    use crate::repository::{ArtifactSink, LocalCacheStore};
    use crate::service::{StandardCacheService, StandardReportService};
    use gantry_client::CoverageMetadata;
    use gantry_core::domain::cache::CacheKey;
    use gantry_core::domain::log::LogLevel;
    use gantry_core::domain::pipeline::Step;
    use gantry_core::domain::run::StageStatus;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Invoker that records programs and fails the one it is told to
    struct ScriptedInvoker {
        fail_program: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedInvoker {
        fn passing() -> Self {
            Self {
                fail_program: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(program: &str) -> Self {
            Self {
                fail_program: Some(program.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandInvoker for ScriptedInvoker {
        async fn invoke(
            &self,
            step: &Step,
            _workspace: &Path,
            _env: &HashMap<String, String>,
            _timeout: Option<Duration>,
        ) -> Result<StepOutput, StageError> {
            self.calls.lock().unwrap().push(step.program.clone());
            let exit_code = match &self.fail_program {
                Some(program) if *program == step.program => 1,
                _ => 0,
            };
            Ok(StepOutput {
                stdout: String::new(),
                stderr: String::new(),
                exit_code,
            })
        }
    }

    /// Invoker that materializes the vendor directory like the real step
    struct VendoringInvoker;

    #[async_trait]
    impl CommandInvoker for VendoringInvoker {
        async fn invoke(
            &self,
            step: &Step,
            workspace: &Path,
            _env: &HashMap<String, String>,
            _timeout: Option<Duration>,
        ) -> Result<StepOutput, StageError> {
            if step.program == "cargo" && step.args.first().map(String::as_str) == Some("vendor") {
                let dest = workspace.join(step.args.last().unwrap());
                std::fs::create_dir_all(&dest).unwrap();
                std::fs::write(dest.join("registry.bin"), b"vendored").unwrap();
            }
            Ok(StepOutput {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: 0,
            })
        }
    }

    struct FakeCacheService {
        hit: bool,
        stored: Mutex<Vec<CacheKey>>,
    }

    impl FakeCacheService {
        fn new(hit: bool) -> Self {
            Self {
                hit,
                stored: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CacheService for FakeCacheService {
        async fn resolve(&self, lock_file_contents: &[u8]) -> CacheEntry {
            let key = CacheKey::from_lock_file(lock_file_contents);
            if self.hit {
                CacheEntry::hit(key, PathBuf::from("/cache/deps"))
            } else {
                CacheEntry::miss(key)
            }
        }

        async fn store(&self, key: &CacheKey, _path: &Path) {
            self.stored.lock().unwrap().push(key.clone());
        }
    }

    struct MapBroker {
        values: HashMap<String, String>,
    }

    impl MapBroker {
        fn with(pairs: &[(&str, &str)]) -> Self {
            Self {
                values: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl SecretBroker for MapBroker {
        async fn resolve(&self, name: &str) -> Result<Secret, StageError> {
            self.values
                .get(name)
                .map(|v| Secret::new(name, v))
                .ok_or_else(|| StageError::CredentialNotFound {
                    name: name.to_string(),
                })
        }
    }

    struct FakeSink {
        fail: bool,
        uploads: Mutex<Vec<PathBuf>>,
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

    struct FakeRegistry {
        published: Mutex<usize>,
    }

    impl FakeRegistry {
        fn new() -> Self {
            Self {
                published: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl PackageRegistry for FakeRegistry {
        async fn publish(&self, _package: &Path, _token: &Secret) -> Result<()> {
            *self.published.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct Harness {
        invoker: Arc<ScriptedInvoker>,
        cache: Arc<FakeCacheService>,
        sink: Arc<FakeSink>,
        registry: Arc<FakeRegistry>,
        service: StandardExecutionService,
    }

    fn harness(
        invoker: ScriptedInvoker,
        cache_hit: bool,
        secrets: &[(&str, &str)],
        sink_fails: bool,
        config: Config,
    ) -> Harness {
        let invoker = Arc::new(invoker);
        let cache = Arc::new(FakeCacheService::new(cache_hit));
        let sink = Arc::new(FakeSink::new(sink_fails));
        let registry = Arc::new(FakeRegistry::new());

        let reporter = Arc::new(StandardReportService::new(
            sink.clone(),
            CoverageMetadata::default(),
            config.fail_on_upload_error,
        ));

        let service = StandardExecutionService::new(
            config,
            invoker.clone(),
            cache.clone(),
            Arc::new(MapBroker::with(secrets)),
            reporter,
            registry.clone(),
        );

        Harness {
            invoker,
            cache,
            sink,
            registry,
            service,
        }
    }

    fn trace(result: &PipelineResult) -> Vec<(&str, StageStatus)> {
        result
            .stage_results
            .iter()
            .map(|r| (r.stage.as_str(), r.status))
            .collect()
    }

    #[tokio::test]
    async fn test_skip_marker_runs_nothing() {
        let h = harness(
            ScriptedInvoker::passing(),
            false,
            &[("COVERAGE_TOKEN", "t")],
            false,
            Config::default(),
        );

        let event = Event::pull_request("fix bug", "WIP [skip ci]");
        let result = h
            .service
            .execute(&pipelines::build_verify(), &event, &RunInputs::default())
            .await
            .unwrap();

        assert_eq!(result.verdict, Verdict::Skipped);
        assert!(result.stage_results.is_empty());
        assert!(h.invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fail_fast_halts_the_chain() {
        let definition = PipelineDefinition::new(
            "linear",
            vec![
                Stage::command("a", vec![Step::new("tool-a", &[])]),
                Stage::command("b", vec![Step::new("tool-b", &[])]),
                Stage::command("c", vec![Step::new("tool-c", &[])]),
            ],
        );

        let h = harness(
            ScriptedInvoker::failing("tool-b"),
            false,
            &[],
            false,
            Config::default(),
        );

        let event = Event::pull_request("fix bug", "Fix");
        let result = h
            .service
            .execute(&definition, &event, &RunInputs::default())
            .await
            .unwrap();

        assert_eq!(
            trace(&result),
            vec![("a", StageStatus::Succeeded), ("b", StageStatus::Failed)]
        );
        assert_eq!(
            result.verdict,
            Verdict::Failed {
                stage: "b".to_string()
            }
        );
        // c was never invoked
        assert_eq!(h.invoker.calls(), vec!["tool-a", "tool-b"]);
    }

    #[tokio::test]
    async fn test_build_pipeline_with_cache_hit() {
        let h = harness(
            ScriptedInvoker::passing(),
            true,
            &[("COVERAGE_TOKEN", "t")],
            false,
            Config::default(),
        );

        let event = Event::pull_request("fix bug", "Fix the bug");
        let inputs = RunInputs::with_lock_file(b"lock".to_vec());
        let result = h
            .service
            .execute(&pipelines::build_verify(), &event, &inputs)
            .await
            .unwrap();

        assert_eq!(
            trace(&result),
            vec![
                ("checkout", StageStatus::Succeeded),
                ("conflict-check", StageStatus::Succeeded),
                ("setup-runtime", StageStatus::Succeeded),
                ("install", StageStatus::Skipped),
                ("quality-gate", StageStatus::Succeeded),
                ("test", StageStatus::Succeeded),
                ("coverage-upload", StageStatus::Succeeded),
            ]
        );
        assert_eq!(result.verdict, Verdict::Succeeded);

        // The install step (`cargo vendor`) never ran: the only cargo
        // invocations are the two quality-gate steps and the test step
        let cargo_calls = h.invoker.calls().iter().filter(|c| *c == "cargo").count();
        assert_eq!(cargo_calls, 3);
        assert!(h.cache.stored.lock().unwrap().is_empty());
        assert_eq!(h.sink.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cache_miss_runs_install_and_stores() {
        let h = harness(
            ScriptedInvoker::passing(),
            false,
            &[("COVERAGE_TOKEN", "t")],
            false,
            Config::default(),
        );

        let event = Event::pull_request("fix bug", "Fix the bug");
        let inputs = RunInputs::with_lock_file(b"lock".to_vec());
        let result = h
            .service
            .execute(&pipelines::build_verify(), &event, &inputs)
            .await
            .unwrap();

        let install = result.stage("install").unwrap();
        assert_eq!(install.status, StageStatus::Succeeded);

        let stored = h.cache.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], CacheKey::from_lock_file(b"lock"));
    }

    #[tokio::test]
    async fn test_second_run_hits_cache_after_install() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = tmp.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();

        let config = Config {
            workspace,
            cache_dir: tmp.path().join("cache"),
            ..Config::default()
        };

        let store = Arc::new(LocalCacheStore::new(
            config.cache_dir.clone(),
            config.cache_max_entries,
        ));
        let cache = Arc::new(StandardCacheService::new(store));
        let sink = Arc::new(FakeSink::new(false));
        let reporter = Arc::new(StandardReportService::new(
            sink,
            CoverageMetadata::default(),
            true,
        ));
        let service = StandardExecutionService::new(
            config,
            Arc::new(VendoringInvoker),
            cache,
            Arc::new(MapBroker::with(&[("COVERAGE_TOKEN", "t")])),
            reporter,
            Arc::new(FakeRegistry::new()),
        );

        let event = Event::pull_request("fix bug", "Fix the bug");
        let inputs = RunInputs::with_lock_file(b"lock-v1".to_vec());

        // First run misses, installs, and stores the vendored directory
        let first = service
            .execute(&pipelines::build_verify(), &event, &inputs)
            .await
            .unwrap();
        assert_eq!(first.stage("install").unwrap().status, StageStatus::Succeeded);
        assert_eq!(first.verdict, Verdict::Succeeded);

        // Second run with the same lock contents hits and skips install
        let second = service
            .execute(&pipelines::build_verify(), &event, &inputs)
            .await
            .unwrap();
        assert_eq!(second.stage("install").unwrap().status, StageStatus::Skipped);
        assert_eq!(second.verdict, Verdict::Succeeded);
    }

    #[tokio::test]
    async fn test_no_lock_file_forces_gated_stage_to_run() {
        let h = harness(
            ScriptedInvoker::passing(),
            true,
            &[("COVERAGE_TOKEN", "t")],
            false,
            Config::default(),
        );

        let event = Event::pull_request("fix bug", "Fix the bug");
        let result = h
            .service
            .execute(&pipelines::build_verify(), &event, &RunInputs::default())
            .await
            .unwrap();

        let install = result.stage("install").unwrap();
        assert_eq!(install.status, StageStatus::Succeeded);
        assert!(h.cache.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_release_with_missing_registry_token() {
        let h = harness(
            ScriptedInvoker::passing(),
            false,
            &[],
            false,
            Config::default(),
        );

        let result = h
            .service
            .execute(
                &pipelines::release_publish(),
                &Event::release(),
                &RunInputs::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            result.verdict,
            Verdict::Failed {
                stage: "publish".to_string()
            }
        );
        let publish = result.stage("publish").unwrap();
        assert!(
            publish
                .error_message
                .as_deref()
                .unwrap()
                .contains("credential")
        );
        // Nothing was published
        assert_eq!(*h.registry.published.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_release_publishes_with_token() {
        let h = harness(
            ScriptedInvoker::passing(),
            false,
            &[("REGISTRY_TOKEN", "t")],
            false,
            Config::default(),
        );

        let result = h
            .service
            .execute(
                &pipelines::release_publish(),
                &Event::release(),
                &RunInputs::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.verdict, Verdict::Succeeded);
        assert_eq!(*h.registry.published.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_release_ignores_skip_marker() {
        let h = harness(
            ScriptedInvoker::passing(),
            false,
            &[("REGISTRY_TOKEN", "t")],
            false,
            Config::default(),
        );

        let mut event = Event::release();
        event.head_commit_message = Some("v1.2.3 [skip ci]".to_string());

        let result = h
            .service
            .execute(&pipelines::release_publish(), &event, &RunInputs::default())
            .await
            .unwrap();
        assert_eq!(result.verdict, Verdict::Succeeded);
    }

    #[tokio::test]
    async fn test_upload_failure_fails_the_build_pipeline() {
        let h = harness(
            ScriptedInvoker::passing(),
            false,
            &[("COVERAGE_TOKEN", "t")],
            true,
            Config::default(),
        );

        let event = Event::pull_request("fix bug", "Fix the bug");
        let result = h
            .service
            .execute(&pipelines::build_verify(), &event, &RunInputs::default())
            .await
            .unwrap();

        assert_eq!(
            result.verdict,
            Verdict::Failed {
                stage: "coverage-upload".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_best_effort_upload_after_failure() {
        let definition = PipelineDefinition::new(
            "custom",
            vec![
                Stage::command("test", vec![Step::new("tool-test", &[])])
                    .with_artifact("cobertura.xml"),
                Stage::command("docs", vec![Step::new("tool-docs", &[])]),
                Stage {
                    name: "coverage-upload".to_string(),
                    kind: StageKind::CoverageUpload,
                    steps: Vec::new(),
                    depends_on_cache: false,
                    secrets: vec![COVERAGE_TOKEN.to_string()],
                    artifact: None,
                },
            ],
        );

        let config = Config {
            upload_after_failure: true,
            ..Config::default()
        };

        let h = harness(
            ScriptedInvoker::failing("tool-docs"),
            false,
            &[("COVERAGE_TOKEN", "t")],
            false,
            config,
        );

        let event = Event::pull_request("fix bug", "Fix the bug");
        let result = h
            .service
            .execute(&definition, &event, &RunInputs::default())
            .await
            .unwrap();

        // The verdict still reflects the failure
        assert_eq!(
            result.verdict,
            Verdict::Failed {
                stage: "docs".to_string()
            }
        );
        // But the coverage artifact was forwarded anyway
        assert_eq!(h.sink.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_best_effort_upload_scoped_to_declared_secrets() {
        let definition = PipelineDefinition::new(
            "custom",
            vec![
                Stage::command("test", vec![Step::new("tool-test", &[])])
                    .with_artifact("cobertura.xml"),
                Stage::command("docs", vec![Step::new("tool-docs", &[])]),
                Stage {
                    name: "coverage-upload".to_string(),
                    kind: StageKind::CoverageUpload,
                    steps: Vec::new(),
                    depends_on_cache: false,
                    secrets: vec!["TEAM_COVERAGE_TOKEN".to_string()],
                    artifact: None,
                },
            ],
        );

        let config = Config {
            upload_after_failure: true,
            ..Config::default()
        };

        // The broker knows the conventional name, but the stage declares a
        // different one; the upload must stay inside the declared scope
        let h = harness(
            ScriptedInvoker::failing("tool-docs"),
            false,
            &[("COVERAGE_TOKEN", "t")],
            false,
            config,
        );

        let event = Event::pull_request("fix bug", "Fix the bug");
        let result = h
            .service
            .execute(&definition, &event, &RunInputs::default())
            .await
            .unwrap();

        assert_eq!(
            result.verdict,
            Verdict::Failed {
                stage: "docs".to_string()
            }
        );
        assert!(h.sink.uploads.lock().unwrap().is_empty());
        assert!(result.logs.iter().any(|l| l.level == LogLevel::Warning));
    }

    #[tokio::test]
    async fn test_coverage_stage_without_artifact_fails() {
        let definition = PipelineDefinition::new(
            "upload-only",
            vec![Stage {
                name: "coverage-upload".to_string(),
                kind: StageKind::CoverageUpload,
                steps: Vec::new(),
                depends_on_cache: false,
                secrets: vec![COVERAGE_TOKEN.to_string()],
                artifact: None,
            }],
        );

        let h = harness(
            ScriptedInvoker::passing(),
            false,
            &[("COVERAGE_TOKEN", "t")],
            false,
            Config::default(),
        );

        let event = Event::pull_request("fix bug", "Fix the bug");
        let result = h
            .service
            .execute(&definition, &event, &RunInputs::default())
            .await
            .unwrap();

        assert_eq!(
            result.verdict,
            Verdict::Failed {
                stage: "coverage-upload".to_string()
            }
        );
    }
}
