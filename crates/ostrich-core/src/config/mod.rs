//! Configuration system for ostrich.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OstrichError, OstrichResult};
use crate::traits::{OpenOptions, DEFAULT_PAGE_SIZE};

/// Archive manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Archives opened by `ArchiveManager::initialize`.
    pub archives: Vec<PathBuf>,
    /// Open paginated stores instead of one-shot ones.
    pub use_buffering: bool,
    /// Rows per page for paginated stores.
    pub page_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            archives: Vec::new(),
            use_buffering: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> OstrichResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| OstrichError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| OstrichError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| OstrichError::Configuration(e.to_string())),
            _ => Err(OstrichError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Create config from environment variables.
    ///
    /// Reads:
    /// - `OSTRICH_ARCHIVES` (comma separated paths, default: none)
    /// - `OSTRICH_USE_BUFFERING` (default: true)
    /// - `OSTRICH_PAGE_SIZE` (default: 128)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(archives) = std::env::var("OSTRICH_ARCHIVES") {
            config.archives = archives
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        if let Ok(value) = std::env::var("OSTRICH_USE_BUFFERING") {
            if let Ok(flag) = value.parse() {
                config.use_buffering = flag;
            }
        }

        if let Ok(value) = std::env::var("OSTRICH_PAGE_SIZE") {
            if let Ok(size) = value.parse::<usize>() {
                config.page_size = size.max(1);
            }
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> ResolverConfigBuilder {
        ResolverConfigBuilder::default()
    }

    /// Options used when the manager opens an archive on its own.
    pub fn open_options(&self) -> OpenOptions {
        if self.use_buffering {
            OpenOptions::buffered(self.page_size)
        } else {
            OpenOptions::unbuffered()
        }
    }
}

/// Builder for ResolverConfig.
#[derive(Default)]
pub struct ResolverConfigBuilder {
    config: ResolverConfig,
}

impl ResolverConfigBuilder {
    /// Add an archive to preload.
    pub fn archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.archives.push(path.into());
        self
    }

    /// Choose paginated or one-shot stores.
    pub fn use_buffering(mut self, use_buffering: bool) -> Self {
        self.config.use_buffering = use_buffering;
        self
    }

    /// Set rows per page.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size.max(1);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ResolverConfig {
        self.config
    }
}
