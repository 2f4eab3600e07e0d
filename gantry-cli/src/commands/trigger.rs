//! Trigger command handler

use anyhow::Result;
use colored::*;

use gantry_core::domain::trigger::Trigger;

use crate::commands::EventArgs;

/// Handle the trigger command
///
/// Evaluates only the trigger predicate and prints the decision.
pub fn handle_trigger(event_args: &EventArgs, skip_marker: &str) -> Result<()> {
    let trigger = Trigger::with_skip_marker(skip_marker);
    let event = event_args.to_event();

    if trigger.should_run(&event) {
        println!("{}", "run".green());
    } else {
        println!("{}", "skip".yellow());
    }

    Ok(())
}
