//! Core domain types
//!
//! This module contains the domain structures shared across Gantry crates.
//! They describe pipelines and their runs; execution logic lives in the
//! runner, outbound HTTP in the client crate.

pub mod cache;
pub mod event;
pub mod log;
pub mod pipeline;
pub mod run;
pub mod secret;
pub mod trigger;
