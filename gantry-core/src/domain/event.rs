//! Trigger event types

use serde::{Deserialize, Serialize};

/// The kind of event that can start a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PullRequestUpdated,
    ReleasePublished,
}

/// An event delivered by the forge
///
/// Message and title are only populated for pull-request events; release
/// events carry neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    #[serde(default)]
    pub head_commit_message: Option<String>,
    #[serde(default)]
    pub pull_request_title: Option<String>,
}

impl Event {
    /// Creates a pull-request-updated event
    pub fn pull_request(
        head_commit_message: impl Into<String>,
        pull_request_title: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::PullRequestUpdated,
            head_commit_message: Some(head_commit_message.into()),
            pull_request_title: Some(pull_request_title.into()),
        }
    }

    /// Creates a release-published event
    pub fn release() -> Self {
        Self {
            kind: EventKind::ReleasePublished,
            head_commit_message: None,
            pull_request_title: None,
        }
    }
}
