//! Pipeline domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::trigger::Trigger;

/// Pipeline definition
///
/// An ordered stage chain plus the trigger predicate that gates it.
/// Immutable once loaded; the runner never mutates a definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub trigger: Trigger,
    pub stages: Vec<Stage>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PipelineDefinition {
    /// Creates a definition with a fresh id and the default trigger
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            trigger: Trigger::default(),
            stages,
            created_at: chrono::Utc::now(),
        }
    }

    /// Looks up a stage by name
    pub fn stage_named(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }
}

/// How a stage is carried out
///
/// Command stages shell out to external tools; the other kinds call a
/// dedicated external collaborator instead of spawning a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Command,
    CoverageUpload,
    PublishPackage,
}

/// A named unit of work within a pipeline
///
/// Stage ordering is total: a stage never starts unless every stage before
/// it succeeded (or was skipped by a cache hit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    #[serde(default = "default_stage_kind")]
    pub kind: StageKind,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Skipped entirely when the cache resolver reports a hit
    #[serde(default)]
    pub depends_on_cache: bool,
    /// Named credentials this stage declares; no other stage sees them
    #[serde(default)]
    pub secrets: Vec<String>,
    /// Relative path of an artifact the stage is expected to produce
    #[serde(default)]
    pub artifact: Option<String>,
}

fn default_stage_kind() -> StageKind {
    StageKind::Command
}

impl Stage {
    /// Creates a command stage with the given steps
    pub fn command(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Command,
            steps,
            depends_on_cache: false,
            secrets: Vec::new(),
            artifact: None,
        }
    }

    /// Marks the stage as gated on the dependency cache
    pub fn gated_on_cache(mut self) -> Self {
        self.depends_on_cache = true;
        self
    }

    /// Declares a named secret for this stage
    pub fn with_secret(mut self, name: impl Into<String>) -> Self {
        self.secrets.push(name.into());
        self
    }

    /// Declares an artifact the stage produces
    pub fn with_artifact(mut self, path: impl Into<String>) -> Self {
        self.artifact = Some(path.into());
        self
    }
}

/// A single shell-like invocation within a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Step {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_builder() {
        let stage = Stage::command("install", vec![Step::new("pkg", &["install"])])
            .gated_on_cache()
            .with_secret("REGISTRY_TOKEN");

        assert_eq!(stage.kind, StageKind::Command);
        assert!(stage.depends_on_cache);
        assert_eq!(stage.secrets, vec!["REGISTRY_TOKEN".to_string()]);
    }

    #[test]
    fn test_definition_round_trips_through_json() {
        let definition = PipelineDefinition::new(
            "build",
            vec![Stage::command("checkout", vec![Step::new("git", &["fetch"])])],
        );

        let json = serde_json::to_string(&definition).unwrap();
        let parsed: PipelineDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "build");
        assert_eq!(parsed.stages.len(), 1);
        assert_eq!(parsed.trigger.skip_marker, "[skip ci]");
    }
}
