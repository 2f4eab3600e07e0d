//! Runner configuration
//!
//! Defines all configurable parameters for pipeline execution including
//! stage timeouts, cache location and retention, and the artifact-upload
//! failure policy.

use std::path::PathBuf;
use std::time::Duration;

/// Runner configuration
///
/// Timeouts and the upload policies are configurable because the pipeline
/// semantics leave them open: stages never retry, but how long a stage may
/// run and whether a failed run still uploads coverage are deployment
/// choices.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the pipeline's steps run in
    pub workspace: PathBuf,

    /// Dependency lock file whose contents key the cache
    pub lock_file: PathBuf,

    /// Directory (relative to the workspace) restored from and stored to
    /// the dependency cache
    pub cache_path: PathBuf,

    /// Root directory of the local cache store
    pub cache_dir: PathBuf,

    /// Retention bound for the local cache store; oldest entries beyond
    /// this are pruned on write
    pub cache_max_entries: usize,

    /// Maximum time a single step may run; `None` disables the timeout
    pub stage_timeout: Option<Duration>,

    /// Attempt a best-effort coverage upload even after a stage failed
    ///
    /// Off by default: the stage chain is all-or-nothing and a failure
    /// short-circuits remaining work, artifact upload included.
    pub upload_after_failure: bool,

    /// Treat a coverage-upload failure as a pipeline failure
    pub fail_on_upload_error: bool,

    /// Coverage collector base URL
    pub collector_url: String,

    /// Package registry base URL
    pub registry_url: String,

    /// Account name the registry token belongs to
    pub registry_username: String,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            lock_file: PathBuf::from("Cargo.lock"),
            cache_path: PathBuf::from("deps"),
            cache_dir: PathBuf::from(".gantry/cache"),
            cache_max_entries: 64,
            stage_timeout: Some(Duration::from_secs(3600)),
            upload_after_failure: false,
            fail_on_upload_error: true,
            collector_url: "https://codecov.io".to_string(),
            registry_url: "https://registry.example.com".to_string(),
            registry_username: "__token__".to_string(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - GANTRY_WORKSPACE (default: current directory)
    /// - GANTRY_LOCK_FILE (default: Cargo.lock)
    /// - GANTRY_CACHE_PATH (default: deps)
    /// - GANTRY_CACHE_DIR (default: .gantry/cache)
    /// - GANTRY_CACHE_MAX_ENTRIES (default: 64)
    /// - GANTRY_STAGE_TIMEOUT (seconds, default: 3600, 0 disables)
    /// - GANTRY_UPLOAD_AFTER_FAILURE (default: false)
    /// - GANTRY_FAIL_ON_UPLOAD_ERROR (default: true)
    /// - GANTRY_COLLECTOR_URL
    /// - GANTRY_REGISTRY_URL
    /// - GANTRY_REGISTRY_USERNAME (default: __token__)
    pub fn from_env() -> anyhow::Result<Self> {
        let workspace = std::env::var("GANTRY_WORKSPACE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let mut config = Self::new(workspace);

        if let Ok(lock_file) = std::env::var("GANTRY_LOCK_FILE") {
            config.lock_file = PathBuf::from(lock_file);
        }
        if let Ok(cache_path) = std::env::var("GANTRY_CACHE_PATH") {
            config.cache_path = PathBuf::from(cache_path);
        }
        if let Ok(cache_dir) = std::env::var("GANTRY_CACHE_DIR") {
            config.cache_dir = PathBuf::from(cache_dir);
        }
        if let Some(max_entries) = std::env::var("GANTRY_CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            config.cache_max_entries = max_entries;
        }
        if let Some(timeout) = std::env::var("GANTRY_STAGE_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.stage_timeout = if timeout == 0 {
                None
            } else {
                Some(Duration::from_secs(timeout))
            };
        }
        if let Some(upload) = std::env::var("GANTRY_UPLOAD_AFTER_FAILURE")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
        {
            config.upload_after_failure = upload;
        }
        if let Some(fail) = std::env::var("GANTRY_FAIL_ON_UPLOAD_ERROR")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
        {
            config.fail_on_upload_error = fail;
        }
        if let Ok(url) = std::env::var("GANTRY_COLLECTOR_URL") {
            config.collector_url = url;
        }
        if let Ok(url) = std::env::var("GANTRY_REGISTRY_URL") {
            config.registry_url = url;
        }
        if let Ok(username) = std::env::var("GANTRY_REGISTRY_USERNAME") {
            config.registry_username = username;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache_max_entries == 0 {
            anyhow::bail!("cache_max_entries must be greater than 0");
        }

        if let Some(timeout) = self.stage_timeout {
            if timeout.as_secs() == 0 {
                anyhow::bail!("stage_timeout must be greater than 0 when set");
            }
        }

        if !self.collector_url.starts_with("http://") && !self.collector_url.starts_with("https://")
        {
            anyhow::bail!("collector_url must start with http:// or https://");
        }

        if !self.registry_url.starts_with("http://") && !self.registry_url.starts_with("https://") {
            anyhow::bail!("registry_url must start with http:// or https://");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}
