//! Lister configuration, loadable from JSON or YAML.

use crate::graph::{DependencyGraphBuilder, PathNormalization, TraversalMode};
use crate::resolve::{search_paths_for_prefix, BuildTarget};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid JSON config: {reason}")]
    InvalidJson { reason: String },

    #[error("Invalid YAML config: {reason}")]
    InvalidYaml { reason: String },

    #[error("Unsupported config file extension: {path} (expected .json, .yaml or .yml)")]
    UnsupportedExtension { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListerConfig {
    /// Caller search paths, highest priority first.
    pub search_paths: Vec<PathBuf>,
    /// Install prefix whose per-target `lib`/`bin` directories are searched
    /// after `search_paths`.
    pub prefix: Option<PathBuf>,
    pub targets: Vec<BuildTarget>,
    pub parallel: bool,
    /// Worker threads for parallel traversal; defaults to the CPU count.
    pub threads: Option<usize>,
    /// Canonicalize through symlinks (true) or normalize lexically (false).
    pub follow_symlinks: bool,
}

impl Default for ListerConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            prefix: None,
            targets: BuildTarget::ALL.to_vec(),
            parallel: false,
            threads: None,
            follow_symlinks: true,
        }
    }
}

impl ListerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content)?,
            _ => {
                return Err(ConfigError::UnsupportedExtension {
                    path: path.display().to_string(),
                })
            }
        };
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::InvalidJson {
            reason: e.to_string(),
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            reason: e.to_string(),
        })
    }

    /// Explicit search paths followed by prefix-derived ones, first
    /// occurrence kept.
    pub fn effective_search_paths(&self) -> Vec<PathBuf> {
        let prefixed = self
            .prefix
            .as_deref()
            .map(|prefix| search_paths_for_prefix(prefix, &self.targets))
            .unwrap_or_default();

        let mut seen = HashSet::new();
        self.search_paths
            .iter()
            .cloned()
            .chain(prefixed)
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }

    pub fn traversal_mode(&self) -> TraversalMode {
        if self.parallel {
            TraversalMode::Parallel {
                threads: self.threads.unwrap_or_else(num_cpus::get).max(1),
            }
        } else {
            TraversalMode::Sequential
        }
    }

    pub fn normalization(&self) -> PathNormalization {
        if self.follow_symlinks {
            PathNormalization::Canonical
        } else {
            PathNormalization::Lexical
        }
    }

    pub fn builder(&self) -> DependencyGraphBuilder {
        DependencyGraphBuilder::new(&self.effective_search_paths())
            .with_mode(self.traversal_mode())
            .with_normalization(self.normalization())
    }
}
