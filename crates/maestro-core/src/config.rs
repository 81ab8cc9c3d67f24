//! Configuration management for Maestro
//!
//! Repository-level settings live in `.maestro/config.toml`. The loaded
//! [`MaestroConfig`] is handed to the orchestrator at construction; nothing
//! downstream probes the filesystem for defaults on its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{MaestroError, Result, Strategy};

/// Directory holding Maestro state inside a repository
pub const MAESTRO_DIR: &str = ".maestro";

/// Repository-level Maestro configuration
///
/// Loaded from `.maestro/config.toml` in the repo root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaestroConfig {
    /// Workflow execution defaults
    #[serde(default)]
    pub workflow: WorkflowDefaults,

    /// Activity logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default workflow parameters, overridable per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefaults {
    /// Directory containing worker documents
    #[serde(default = "default_worker_directory")]
    pub worker_directory: PathBuf,

    /// Plan strategy used when a request does not name one
    #[serde(default)]
    pub strategy: Strategy,

    /// Phase attempts allowed per run (0 = unlimited)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Publish phase outputs to later phases
    #[serde(default = "default_true")]
    pub context_sharing: bool,

    /// Wall-clock deadline for a single phase
    #[serde(default = "default_phase_timeout_secs")]
    pub phase_timeout_secs: u64,

    /// Run phases with no dependency path between them concurrently
    #[serde(default)]
    pub parallel_phases: bool,

    /// Reject explicit worker lists that resolve to nothing instead of
    /// falling back to the default triad
    #[serde(default)]
    pub strict_worker_selection: bool,

    /// Persist built-in descriptors for capabilities the registry lacks
    #[serde(default)]
    pub auto_create_workers: bool,
}

/// Activity log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Append a human-readable run log to `.maestro/activity.md`
    #[serde(default = "default_true")]
    pub activity_log: bool,
}

fn default_worker_directory() -> PathBuf {
    PathBuf::from(MAESTRO_DIR).join("workers")
}

fn default_max_iterations() -> usize {
    10
}

fn default_phase_timeout_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl MaestroConfig {
    /// Load configuration from `.maestro/config.toml` or use defaults
    ///
    /// A relative `worker_directory` is resolved against `repo_root`.
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let config_path = repo_root.join(MAESTRO_DIR).join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Self>(&content).map_err(|e| {
                MaestroError::Config(format!("Failed to parse config file: {}", e))
            })?
        } else {
            Self::default()
        };

        if config.workflow.worker_directory.is_relative() {
            config.workflow.worker_directory = repo_root.join(&config.workflow.worker_directory);
        }

        Ok(config)
    }

    /// Write default configuration to `.maestro/config.toml`
    pub fn write_default(repo_root: &Path) -> Result<PathBuf> {
        let config_dir = repo_root.join(MAESTRO_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| MaestroError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Directory for run artifacts such as the activity log
    pub fn state_dir(repo_root: &Path) -> PathBuf {
        repo_root.join(MAESTRO_DIR)
    }
}

impl WorkflowDefaults {
    pub fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.phase_timeout_secs)
    }
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            worker_directory: default_worker_directory(),
            strategy: Strategy::default(),
            max_iterations: default_max_iterations(),
            context_sharing: true,
            phase_timeout_secs: default_phase_timeout_secs(),
            parallel_phases: false,
            strict_worker_selection: false,
            auto_create_workers: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { activity_log: true }
    }
}
