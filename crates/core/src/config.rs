//! Run configuration shared by the CLI and library callers.
//!
//! Files are JSON or YAML, picked by extension. Missing fields fall back to
//! the defaults, and the CLI lays explicit flags over whatever was loaded.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arch::HostArch;
use crate::strip::StripStrategy;
use crate::thinner::ThinOptions;

/// Default search root, matching where macOS installs applications.
pub const DEFAULT_SEARCH_DIRECTORY: &str = "/Applications";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported config format for {} (expected .json, .yaml or .yml)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("unknown architecture '{0}' (allowed: arm64, x86_64, i386, arm, ppc, ppc64)")]
    UnknownArch(String),
}

/// Run configuration, loadable from a JSON or YAML file.
///
/// Every field has a default so partial files are fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinConfig {
    pub search_directory: PathBuf,
    pub dry_run: bool,
    pub remove_unused_framework_versions: bool,
    /// Thin each `*.app` bundle separately instead of the whole tree.
    pub apps_only: bool,
    pub strategy: StripStrategy,
    /// Override the detected host architecture (e.g. `x86_64`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

impl Default for ThinConfig {
    fn default() -> Self {
        Self {
            search_directory: PathBuf::from(DEFAULT_SEARCH_DIRECTORY),
            dry_run: false,
            remove_unused_framework_versions: false,
            apps_only: false,
            strategy: StripStrategy::InPlace,
            arch: None,
        }
    }
}

impl ThinConfig {
    /// Load a config file, choosing the parser by extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if !matches!(ext, "json" | "yaml" | "yml") {
            return Err(ConfigError::UnsupportedFormat(path.to_path_buf()));
        }
        let body = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config = if ext == "json" {
            serde_json::from_str(&body)?
        } else {
            serde_yaml::from_str(&body)?
        };
        Ok(config)
    }

    /// Resolve the host: the configured override if any, otherwise detection.
    pub fn host_arch(&self) -> Result<HostArch, ConfigError> {
        match &self.arch {
            Some(name) => {
                HostArch::from_name(name).ok_or_else(|| ConfigError::UnknownArch(name.clone()))
            }
            None => Ok(HostArch::detect()),
        }
    }

    pub fn thin_options(&self) -> ThinOptions {
        ThinOptions {
            dry_run: self.dry_run,
            remove_unused_framework_versions: self.remove_unused_framework_versions,
            strategy: self.strategy,
        }
    }
}
