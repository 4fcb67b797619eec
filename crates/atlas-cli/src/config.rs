// SPDX-License-Identifier: MIT OR Apache-2.0
//! CLI configuration: TOML file loading, validation, and advisory
//! warnings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Parse failure detail.
        reason: String,
    },

    /// Semantic validation failed.
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

/// Advisory findings that do not prevent operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A timeout is unusually large.
    LargeTimeout {
        /// Field name.
        field: &'static str,
        /// Configured seconds.
        secs: u64,
    },
    /// The pool is wider than the host has cores.
    OversizedPool {
        /// Configured width.
        configured: usize,
        /// Host cores.
        cores: usize,
    },
}

/// Top-level CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AtlasConfig {
    /// Download cache directory.
    pub cache_dir: PathBuf,
    /// SQLite database path.
    pub db_path: PathBuf,
    /// Worker pool width; 0 means "number of cores".
    pub pool_size: usize,
    /// Per-request HTTP timeout, seconds.
    pub http_timeout_secs: u64,
    /// Minimum spacing between requests to one host, milliseconds.
    pub host_spacing_ms: u64,
    /// Overall job deadline, seconds.
    pub job_timeout_secs: u64,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".shadow-atlas/cache"),
            db_path: PathBuf::from(".shadow-atlas/atlas.db"),
            pool_size: 0,
            http_timeout_secs: 30,
            host_spacing_ms: 500,
            job_timeout_secs: 6 * 60 * 60,
        }
    }
}

impl AtlasConfig {
    /// Load a config file, or defaults when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a missing file, a parse failure, or a
    /// semantically invalid config.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] listing every problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut reasons = Vec::new();
        if self.http_timeout_secs == 0 {
            reasons.push("http_timeout_secs must be positive".to_owned());
        }
        if self.job_timeout_secs == 0 {
            reasons.push("job_timeout_secs must be positive".to_owned());
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError { reasons })
        }
    }

    /// Advisory warnings for suspicious but workable settings.
    #[must_use]
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.http_timeout_secs > 600 {
            warnings.push(ConfigWarning::LargeTimeout {
                field: "http_timeout_secs",
                secs: self.http_timeout_secs,
            });
        }
        let cores = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1);
        if self.pool_size > cores * 4 {
            warnings.push(ConfigWarning::OversizedPool {
                configured: self.pool_size,
                cores,
            });
        }
        warnings
    }

    /// Effective pool width.
    #[must_use]
    pub fn effective_pool_size(&self) -> usize {
        if self.pool_size == 0 {
            atlas_runtime::pool::default_pool_size()
        } else {
            self.pool_size.max(2)
        }
    }
}
