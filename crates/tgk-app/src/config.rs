//! Kit configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration.
//!
//! ```toml
//! data_dir = "/var/lib/tgk/data"
//! cache_dir = "/var/cache/tgk"
//! outbox_dir = "/var/lib/tgk/outbox"
//! memory_cache_capacity = 10000
//! log_filter = "info,tgk_flags=debug"
//! log_format = "json"
//! push_token = "deadbeef"
//! device_identifier = "6f1c2a52-4bd4-4b5e-9a55-0d3c7f7b1e11"
//! api_mirror_dir = "/srv/tgk-api"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tgk_flags::PushToken;
use uuid::Uuid;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid TOML for [`KitConfig`]
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration cannot be serialized
    #[error("cannot write config: {0}")]
    Write(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Kit configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KitConfig {
    /// Durable directory holding the favorites sets
    pub data_dir: PathBuf,
    /// Purgeable directory holding keeper snapshots and API responses
    pub cache_dir: PathBuf,
    /// Directory the CLI writes upload bodies to
    pub outbox_dir: PathBuf,
    /// Entry limit of every memory layer
    pub memory_cache_capacity: u64,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Push token as hex
    pub push_token: Option<String>,
    /// Identifier uploads are filed under
    pub device_identifier: Option<Uuid>,
    /// Directory mirroring the matches API, e.g. `matches/all.json`
    pub api_mirror_dir: Option<PathBuf>,
}

impl Default for KitConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("tgk/data"),
            cache_dir: PathBuf::from("tgk/cache"),
            outbox_dir: PathBuf::from("tgk/outbox"),
            memory_cache_capacity: tgk_storage::DEFAULT_MEMORY_CAPACITY,
            log_filter: "info".to_string(),
            log_format: LogFormat::Text,
            push_token: None,
            device_identifier: None,
            api_mirror_dir: None,
        }
    }
}

impl KitConfig {
    /// Read and validate a TOML file
    ///
    /// # Errors
    /// [`ConfigError`] if the file is unreadable, malformed or invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// [`ConfigError`] if the text is malformed or invalid
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// [`ConfigError::Write`] if a value has no TOML form
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "memory_cache_capacity must be positive".to_string(),
            ));
        }
        for (field, dir) in [
            ("data_dir", &self.data_dir),
            ("cache_dir", &self.cache_dir),
            ("outbox_dir", &self.outbox_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }
        if let Some(token) = &self.push_token {
            PushToken::from_hex(token)
                .map_err(|err| ConfigError::Invalid(format!("push_token: {err}")))?;
        }
        Ok(())
    }

    /// Parsed push token, `None` when unset or malformed
    #[must_use]
    pub fn push_token(&self) -> Option<PushToken> {
        self.push_token
            .as_deref()
            .and_then(|token| PushToken::from_hex(token).ok())
    }

    /// Place all directories under `root`
    #[must_use]
    pub fn rooted_at(self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.with_data_dir(root.join("data"))
            .with_cache_dir(root.join("cache"))
            .with_outbox_dir(root.join("outbox"))
    }

    /// Set data directory
    #[inline]
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set cache directory
    #[inline]
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set outbox directory
    #[inline]
    #[must_use]
    pub fn with_outbox_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.outbox_dir = dir.into();
        self
    }

    /// Set memory layer capacity
    #[inline]
    #[must_use]
    pub fn with_memory_cache_capacity(mut self, capacity: u64) -> Self {
        self.memory_cache_capacity = capacity;
        self
    }

    /// Set log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Set log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Set push token hex
    #[inline]
    #[must_use]
    pub fn with_push_token(mut self, token: impl Into<String>) -> Self {
        self.push_token = Some(token.into());
        self
    }

    /// Set device identifier
    #[inline]
    #[must_use]
    pub fn with_device_identifier(mut self, id: Uuid) -> Self {
        self.device_identifier = Some(id);
        self
    }

    /// Set API mirror directory
    #[inline]
    #[must_use]
    pub fn with_api_mirror_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.api_mirror_dir = Some(dir.into());
        self
    }
}
