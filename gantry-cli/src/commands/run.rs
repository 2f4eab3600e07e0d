//! Run command handler
//!
//! Wires the execution service to its concrete collaborators (local cache
//! store, environment secret store, HTTP collector and registry), runs the
//! pipeline, and prints the per-stage trace and verdict.

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use gantry_client::CoverageMetadata;
use gantry_core::domain::pipeline::PipelineDefinition;
use gantry_core::domain::run::{PipelineResult, StageStatus, Verdict};
use gantry_runner::repository::{
    EnvSecretStore, HttpArtifactSink, HttpPackageRegistry, LocalCacheStore,
};
use gantry_runner::service::{
    ExecutionService, RunInputs, StandardCacheService, StandardExecutionService,
    StandardReportService, StandardSecretBroker,
};
use gantry_runner::{Config, ProcessInvoker, pipelines};

use crate::commands::{EventArgs, EventKindArg};

/// Built-in pipelines the CLI can run directly
#[derive(Clone, Copy, ValueEnum)]
pub enum BuiltinPipeline {
    /// Pull-request build/verify chain
    Build,
    /// Release publish chain
    Release,
}

/// Handle the run command
pub async fn handle_run(
    pipeline: Option<BuiltinPipeline>,
    file: Option<PathBuf>,
    event_args: &EventArgs,
    config: &Config,
) -> Result<()> {
    let definition = load_definition(pipeline, file, event_args)?;
    let event = event_args.to_event();

    let service = build_service(&definition, config);
    let inputs = load_inputs(config);

    let result = service.execute(&definition, &event, &inputs).await?;
    print_result(&result);

    match result.verdict {
        Verdict::Failed { stage } => anyhow::bail!("pipeline failed at stage '{}'", stage),
        _ => Ok(()),
    }
}

fn load_definition(
    pipeline: Option<BuiltinPipeline>,
    file: Option<PathBuf>,
    event_args: &EventArgs,
) -> Result<PipelineDefinition> {
    if let Some(path) = file {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read pipeline definition {}", path.display()))?;
        return serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse pipeline definition {}", path.display()));
    }

    // Without an explicit choice the event picks the pipeline, matching
    // how the two built-ins are triggered.
    let builtin = pipeline.unwrap_or(match event_args.event {
        EventKindArg::PullRequest => BuiltinPipeline::Build,
        EventKindArg::Release => BuiltinPipeline::Release,
    });

    Ok(match builtin {
        BuiltinPipeline::Build => pipelines::build_verify(),
        BuiltinPipeline::Release => pipelines::release_publish(),
    })
}

fn build_service(definition: &PipelineDefinition, config: &Config) -> StandardExecutionService {
    let store = Arc::new(LocalCacheStore::new(
        config.cache_dir.clone(),
        config.cache_max_entries,
    ));
    let cache = Arc::new(StandardCacheService::new(store));

    let secrets = Arc::new(StandardSecretBroker::new(Arc::new(EnvSecretStore::new())));

    let metadata = CoverageMetadata {
        flags: vec!["unittests".to_string()],
        env: Default::default(),
        name: Some(definition.name.clone()),
    };
    let sink = Arc::new(HttpArtifactSink::new(config.collector_url.clone()));
    let reporter = Arc::new(StandardReportService::new(
        sink,
        metadata,
        config.fail_on_upload_error,
    ));

    let registry = Arc::new(HttpPackageRegistry::new(
        config.registry_url.clone(),
        config.registry_username.clone(),
    ));

    StandardExecutionService::new(
        config.clone(),
        Arc::new(ProcessInvoker::new()),
        cache,
        secrets,
        reporter,
        registry,
    )
}

fn load_inputs(config: &Config) -> RunInputs {
    let lock_path = config.workspace.join(&config.lock_file);
    match std::fs::read(&lock_path) {
        Ok(contents) => RunInputs::with_lock_file(contents),
        Err(e) => {
            warn!(
                "Lock file {} not readable ({}); cache gating disabled",
                lock_path.display(),
                e
            );
            RunInputs::default()
        }
    }
}

fn print_result(result: &PipelineResult) {
    println!("{}", format!("Pipeline: {}", result.pipeline).bold());

    for stage in &result.stage_results {
        match stage.status {
            StageStatus::Succeeded => println!("  {} {}", "✓".green(), stage.stage),
            StageStatus::Skipped => {
                println!("  {} {} {}", "↷".yellow(), stage.stage, "(cache hit)".dimmed())
            }
            StageStatus::Failed => println!(
                "  {} {} {}",
                "✗".red(),
                stage.stage,
                stage.error_message.as_deref().unwrap_or("").dimmed()
            ),
        }
    }

    match &result.verdict {
        Verdict::Succeeded => println!("{}", "Pipeline succeeded".green().bold()),
        Verdict::Failed { stage } => {
            println!("{}", format!("Pipeline failed at '{}'", stage).red().bold())
        }
        Verdict::Skipped => println!("{}", "Pipeline skipped by trigger".yellow()),
    }
}
