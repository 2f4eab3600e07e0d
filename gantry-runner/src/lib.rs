//! Gantry Runner
//!
//! The pipeline orchestrator: given a trigger event and a pipeline
//! definition, it decides whether the run starts at all, executes the
//! stage chain in order with fail-fast semantics, skips cache-gated stages
//! on a lock-file cache hit, injects declared credentials just-in-time,
//! and aggregates per-stage outcomes into a single verdict.
//!
//! Architecture:
//! - Configuration: settings from environment or defaults
//! - Repositories: adapters over the external collaborators (cache store,
//!   secret store, coverage collector, package registry)
//! - Services: business logic (execution, cache resolution, secret
//!   brokering, result reporting)
//! - Invocation: process execution for command stages

pub mod config;
pub mod context;
pub mod invoke;
pub mod pipelines;
pub mod repository;
pub mod service;

pub use config::Config;
pub use context::RunContext;
pub use invoke::{CommandInvoker, ProcessInvoker, StepOutput};
pub use service::{
    CacheService, ExecutionService, ReportService, RunInputs, SecretBroker,
    StandardCacheService, StandardExecutionService, StandardReportService, StandardSecretBroker,
};
