//! Gantry Core
//!
//! Core types and abstractions for the Gantry pipeline orchestrator.
//!
//! This crate contains:
//! - Domain types: events, triggers, pipeline definitions, cache entries,
//!   secrets, and run results
//! - The typed error taxonomy shared by the runner and its collaborators

pub mod domain;
pub mod error;
