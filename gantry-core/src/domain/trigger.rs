//! Trigger evaluation
//!
//! A trigger decides whether an event starts a pipeline at all. The only
//! recognized option is the skip marker, a literal substring whose presence
//! in the pull-request metadata suppresses the run.

use serde::{Deserialize, Serialize};

use crate::domain::event::{Event, EventKind};

/// Default marker recognized in commit messages and PR titles
pub const DEFAULT_SKIP_MARKER: &str = "[skip ci]";

/// Trigger predicate attached to a pipeline definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    /// Substring that suppresses pull-request runs when present
    pub skip_marker: String,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            skip_marker: DEFAULT_SKIP_MARKER.to_string(),
        }
    }
}

impl Trigger {
    /// Creates a trigger with a custom skip marker
    pub fn with_skip_marker(skip_marker: impl Into<String>) -> Self {
        Self {
            skip_marker: skip_marker.into(),
        }
    }

    /// Decides whether a pipeline should run for the given event
    ///
    /// Pull-request events are skipped when the head commit message or the
    /// PR title contains the skip marker. Each field is checked on its own,
    /// so a marker fragment straddling the two never suppresses a run.
    /// Release events always run. Missing fields count as empty strings.
    pub fn should_run(&self, event: &Event) -> bool {
        match event.kind {
            EventKind::ReleasePublished => true,
            EventKind::PullRequestUpdated => {
                let contains_marker = |field: &Option<String>| {
                    field.as_deref().unwrap_or("").contains(&self.skip_marker)
                };
                !contains_marker(&event.head_commit_message)
                    && !contains_marker(&event.pull_request_title)
            }
        }
    }
}
