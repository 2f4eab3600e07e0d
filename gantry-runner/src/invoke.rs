//! Step invocation
//!
//! Command stages are lists of external tool calls. The invoker is the only
//! part of the runner that knows how to start a process; everything above
//! it sees an exit status and captured output. Trait-based so tests can
//! script outcomes without spawning anything.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use gantry_core::domain::pipeline::Step;
use gantry_core::error::StageError;

/// Captured output of one step invocation
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl StepOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Invoker trait for step execution
#[async_trait]
pub trait CommandInvoker: Send + Sync {
    /// Runs one step to completion and captures its output
    ///
    /// # Arguments
    /// * `step` - The program and arguments to run
    /// * `workspace` - Working directory for the invocation
    /// * `env` - Extra environment variables, scoped to this invocation
    ///   (resolved secrets arrive here and nowhere else)
    /// * `timeout` - Maximum run time; `None` waits indefinitely
    async fn invoke(
        &self,
        step: &Step,
        workspace: &Path,
        env: &HashMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<StepOutput, StageError>;
}

/// Process-spawning invoker used outside of tests
pub struct ProcessInvoker;

impl ProcessInvoker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandInvoker for ProcessInvoker {
    async fn invoke(
        &self,
        step: &Step,
        workspace: &Path,
        env: &HashMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<StepOutput, StageError> {
        // The env map may hold secret values; log the command only.
        debug!("Invoking step: {} {:?}", step.program, step.args);

        let mut command = Command::new(&step.program);
        command
            .args(&step.args)
            .current_dir(workspace)
            .envs(env)
            .kill_on_drop(true);

        let output_future = command.output();

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, output_future)
                .await
                .map_err(|_| StageError::TimedOut {
                    program: step.program.clone(),
                    seconds: limit.as_secs(),
                })?,
            None => output_future.await,
        }
        .map_err(|e| StageError::SpawnFailed {
            program: step.program.clone(),
            reason: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(1);

        if output.status.success() {
            debug!(
                "Step completed: exit_code={}, stdout_len={}, stderr_len={}",
                exit_code,
                stdout.len(),
                stderr.len()
            );
        } else {
            debug!(
                "Step failed: {} exit_code={} stderr='{}'",
                step.program,
                exit_code,
                stderr.trim()
            );
        }

        Ok(StepOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invoke_captures_exit_status() {
        let invoker = ProcessInvoker::new();
        let step = Step::new("true", &[]);
        let output = invoker
            .invoke(&step, Path::new("."), &HashMap::new(), None)
            .await
            .unwrap();
        assert!(output.success());

        let step = Step::new("false", &[]);
        let output = invoker
            .invoke(&step, Path::new("."), &HashMap::new(), None)
            .await
            .unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, 1);
    }

    #[tokio::test]
    async fn test_invoke_captures_stdout() {
        let invoker = ProcessInvoker::new();
        let step = Step::new("echo", &["hello"]);
        let output = invoker
            .invoke(&step, Path::new("."), &HashMap::new(), None)
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_invoke_missing_program_is_spawn_failure() {
        let invoker = ProcessInvoker::new();
        let step = Step::new("gantry-no-such-program", &[]);
        let err = invoker
            .invoke(&step, Path::new("."), &HashMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn test_invoke_times_out() {
        let invoker = ProcessInvoker::new();
        let step = Step::new("sleep", &["5"]);
        let err = invoker
            .invoke(
                &step,
                Path::new("."),
                &HashMap::new(),
                Some(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn test_invoke_passes_environment() {
        let invoker = ProcessInvoker::new();
        let mut env = HashMap::new();
        env.insert("GANTRY_TEST_VAR".to_string(), "shhh".to_string());

        let step = Step::new("sh", &["-c", "printf '%s' \"$GANTRY_TEST_VAR\""]);
        let output = invoker
            .invoke(&step, Path::new("."), &env, None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "shhh");
    }
}
