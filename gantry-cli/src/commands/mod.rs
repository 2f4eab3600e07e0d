//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod run;
mod trigger;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use gantry_core::domain::event::Event;
use gantry_core::domain::trigger::DEFAULT_SKIP_MARKER;
use gantry_runner::Config;

pub use run::BuiltinPipeline;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a pipeline for a trigger event
    Run {
        /// Built-in pipeline to run; defaults to the one matching the event
        #[arg(value_enum, conflicts_with = "file")]
        pipeline: Option<BuiltinPipeline>,

        /// Path to a JSON pipeline definition instead of a built-in
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        event: EventArgs,
    },
    /// Evaluate the trigger predicate without running anything
    Trigger {
        #[command(flatten)]
        event: EventArgs,

        /// Skip marker to look for
        #[arg(long, env = "GANTRY_SKIP_MARKER", default_value = DEFAULT_SKIP_MARKER)]
        skip_marker: String,
    },
}

/// Event fields shared by the subcommands
#[derive(Args)]
pub struct EventArgs {
    /// Event kind that triggered this run
    #[arg(long, value_enum, default_value_t = EventKindArg::PullRequest)]
    pub event: EventKindArg,

    /// Head commit message (pull-request events)
    #[arg(long, default_value = "")]
    pub message: String,

    /// Pull request title (pull-request events)
    #[arg(long, default_value = "")]
    pub title: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EventKindArg {
    PullRequest,
    Release,
}

impl EventArgs {
    /// Builds the domain event from the parsed flags
    pub fn to_event(&self) -> Event {
        match self.event {
            EventKindArg::PullRequest => Event::pull_request(&self.message, &self.title),
            EventKindArg::Release => Event::release(),
        }
    }
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run {
            pipeline,
            file,
            event,
        } => run::handle_run(pipeline, file, &event, config).await,
        Commands::Trigger { event, skip_marker } => {
            trigger::handle_trigger(&event, &skip_marker)
        }
    }
}
