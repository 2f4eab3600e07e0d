//! Execution context for pipeline runs
//!
//! Contains the state owned by one pipeline instance:
//! - Log buffer for the run's user-visible log
//! - Workspace path the stages run in
//!
//! Nothing in here survives the run; the only state shared between runs is
//! the external cache store.

use gantry_core::domain::log::{LogEntry, LogLevel};
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

/// Execution context shared across one pipeline run
pub struct RunContext {
    /// This run's id
    pub run_id: Uuid,

    /// Name of the pipeline being run
    pub pipeline: String,

    /// Directory the stages run in
    pub workspace: PathBuf,

    /// Log buffer with entries
    log_buffer: Mutex<Vec<LogEntry>>,
}

impl RunContext {
    /// Creates a new run context
    pub fn new(pipeline: impl Into<String>, workspace: PathBuf) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline: pipeline.into(),
            workspace,
            log_buffer: Mutex::new(Vec::new()),
        }
    }

    /// Adds a log entry to the buffer
    pub fn add_log(&self, level: LogLevel, message: String) {
        let mut buffer = self.log_buffer.lock().unwrap();
        buffer.push(LogEntry {
            timestamp: chrono::Utc::now(),
            level,
            message,
        });
    }

    /// Logs an info message
    pub fn log_info(&self, message: String) {
        self.add_log(LogLevel::Info, message);
    }

    /// Logs a warning message
    pub fn log_warning(&self, message: String) {
        self.add_log(LogLevel::Warning, message);
    }

    /// Logs an error message
    pub fn log_error(&self, message: String) {
        self.add_log(LogLevel::Error, message);
    }

    /// Drains all log entries from the buffer
    ///
    /// Returns all buffered entries and clears the buffer.
    pub fn drain_logs(&self) -> Vec<LogEntry> {
        let mut buffer = self.log_buffer.lock().unwrap();
        buffer.drain(..).collect()
    }
}
