//! Built-in pipeline definitions
//!
//! Two pipelines ship with the runner: the pull-request build/verify chain
//! and the release publish chain. Both can also be expressed as JSON
//! definition files; these are the defaults the CLI offers.

use gantry_core::domain::pipeline::{PipelineDefinition, Stage, StageKind, Step};
use gantry_core::domain::secret::{COVERAGE_TOKEN, REGISTRY_TOKEN};

/// The pull-request build/verify pipeline
///
/// Checkout, merge-conflict check, runtime setup, cache-gated dependency
/// install, format/lint quality gate, tests with a coverage report, and
/// the coverage upload. The `[skip ci]` marker suppresses the whole run.
///
/// The install stage vendors dependencies into `deps/`, the default
/// cache path, so the write-through after a miss has a directory to
/// store.
pub fn build_verify() -> PipelineDefinition {
    let mut definition = PipelineDefinition::new(
        "build-verify",
        vec![
            Stage::command("checkout", vec![Step::new("git", &["fetch", "--prune"])]),
            Stage::command("conflict-check", vec![Step::new("git", &["diff", "--check"])]),
            Stage::command(
                "setup-runtime",
                vec![Step::new("rustup", &["toolchain", "install", "stable"])],
            ),
            Stage::command("install", vec![Step::new("cargo", &["vendor", "--locked", "deps"])])
                .gated_on_cache(),
            Stage::command(
                "quality-gate",
                vec![
                    Step::new("cargo", &["fmt", "--check"]),
                    Step::new("cargo", &["clippy", "--", "-D", "warnings"]),
                ],
            ),
            Stage::command(
                "test",
                vec![Step::new("cargo", &["tarpaulin", "--out", "Xml"])],
            )
            .with_artifact("cobertura.xml"),
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
    definition.description = Some("Build and test every pull-request update".to_string());
    definition
}

/// The release publish pipeline
///
/// Checkout, runtime setup, package build, and the registry upload. Release
/// events are never subject to the skip marker.
pub fn release_publish() -> PipelineDefinition {
    let mut definition = PipelineDefinition::new(
        "release-publish",
        vec![
            Stage::command("checkout", vec![Step::new("git", &["fetch", "--tags"])]),
            Stage::command(
                "setup-runtime",
                vec![Step::new("rustup", &["toolchain", "install", "stable"])],
            ),
            Stage::command("build-package", vec![Step::new("cargo", &["package", "--locked"])])
                .with_artifact("target/package"),
            Stage {
                name: "publish".to_string(),
                kind: StageKind::PublishPackage,
                steps: Vec::new(),
                depends_on_cache: false,
                secrets: vec![REGISTRY_TOKEN.to_string()],
                artifact: None,
            },
        ],
    );
    definition.description = Some("Publish the package when a release is cut".to_string());
    definition
}
