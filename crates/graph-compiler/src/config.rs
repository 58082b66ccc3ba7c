//! Compiler configuration storage
//!
//! Handles persistent storage of code generation and propagation settings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::codegen::SynthesisOptions;
use crate::constants::{defaults, paths};

/// How a propagation pass treats a cyclic graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Report the cycle and write nothing
    #[default]
    FailFast,
    /// Walk depth-first and skip back-edges, leaving nodes in the cycle stale
    SilentStop,
}

fn default_header() -> Vec<String> {
    defaults::HEADER.iter().map(|s| s.to_string()).collect()
}

fn default_emit_preview() -> bool {
    true
}

fn default_error_marker() -> String {
    defaults::ERROR_MARKER.to_string()
}

fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}

/// Full compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Directory `filepath` parameters are resolved against
    #[serde(default)]
    pub root_dir: Option<String>,
    /// Lines emitted once at the top of a generated document
    #[serde(default = "default_header")]
    pub header: Vec<String>,
    /// Emit a guarded `.head()` preview after structured calls
    #[serde(default = "default_emit_preview")]
    pub emit_preview: bool,
    #[serde(default)]
    pub cycle_policy: CyclePolicy,
    /// Substring in execution output that marks a failed run
    #[serde(default = "default_error_marker")]
    pub error_marker: String,
    /// Base URL of a remote schema library
    #[serde(default)]
    pub library_url: Option<String>,
    /// Timeout for remote schema library requests, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            header: default_header(),
            emit_preview: default_emit_preview(),
            cycle_policy: CyclePolicy::default(),
            error_marker: default_error_marker(),
            library_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from disk
    ///
    /// A missing file yields the defaults.
    pub async fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(paths::CONFIG_FILE);

        if !fs::try_exists(&config_path).await.map_err(ConfigError::Io)? {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .await
            .map_err(ConfigError::Io)?;

        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(config_dir).await.map_err(ConfigError::Io)?;

        let config_path = config_dir.join(paths::CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        fs::write(&config_path, contents).await.map_err(ConfigError::Io)?;

        log::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Options for the code synthesizer
    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            root_dir: self.root_dir.clone(),
            header: self.header.clone(),
            emit_preview: self.emit_preview,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}
