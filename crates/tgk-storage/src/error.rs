//! Error types for storages
//!
//! Every storage completes with a [`StorageError`] drawn from one taxonomy:
//! - **NotFound**: the medium has no value for the key yet
//! - **Decode / Encode**: the payload could not be converted
//! - **Transport**: the underlying disk or network failed
//! - **KeyMapping**: a partial key projection rejected the key
//!
//! Only `NotFound` is ever recovered from by combinators.

use std::fmt;
use tgk_mapping::MappingError;

/// Result type for storage operations
pub type Result<T, E = StorageError> = std::result::Result<T, E>;

/// Errors produced by storages and forwarded unchanged through combinators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No value stored for the key
    #[error("no value for key {key} in storage '{storage}'")]
    NotFound {
        /// Diagnostic name of the storage
        storage: String,
        /// Debug rendering of the key
        key: String,
    },

    /// Payload present but malformed
    #[error("decode failed: {0}")]
    Decode(String),

    /// Value could not be serialized
    #[error("encode failed: {0}")]
    Encode(String),

    /// Disk or network failure from the underlying medium
    #[error("transport failure in '{storage}': {message}")]
    Transport {
        /// Diagnostic name of the storage
        storage: String,
        /// Underlying failure description
        message: String,
    },

    /// Key projection produced no underlying key
    #[error("cannot map key {0}")]
    KeyMapping(String),

    /// Deliberate failure of a development storage
    #[error("dev storage failure: {0}")]
    Dev(String),
}

/// Fieldless discriminant of [`StorageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// See [`StorageError::NotFound`]
    NotFound,
    /// See [`StorageError::Decode`]
    Decode,
    /// See [`StorageError::Encode`]
    Encode,
    /// See [`StorageError::Transport`]
    Transport,
    /// See [`StorageError::KeyMapping`]
    KeyMapping,
    /// See [`StorageError::Dev`]
    Dev,
}

impl StorageError {
    /// Create not-found error for a key
    pub fn not_found(storage: impl Into<String>, key: &impl fmt::Debug) -> Self {
        Self::NotFound {
            storage: storage.into(),
            key: format!("{key:?}"),
        }
    }

    /// Create transport error
    pub fn transport(storage: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            storage: storage.into(),
            message: message.to_string(),
        }
    }

    /// Create decode error
    pub fn decode(message: impl fmt::Display) -> Self {
        Self::Decode(message.to_string())
    }

    /// Create encode error
    pub fn encode(message: impl fmt::Display) -> Self {
        Self::Encode(message.to_string())
    }

    /// Map an io error from `storage`, keeping `NotFound` distinct
    pub fn from_io(storage: impl Into<String>, key: &impl fmt::Debug, err: &std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(storage, key)
        } else {
            Self::transport(storage, err)
        }
    }

    /// Error kind
    #[must_use]
    pub fn kind(&self) -> StorageErrorKind {
        match self {
            Self::NotFound { .. } => StorageErrorKind::NotFound,
            Self::Decode(_) => StorageErrorKind::Decode,
            Self::Encode(_) => StorageErrorKind::Encode,
            Self::Transport { .. } => StorageErrorKind::Transport,
            Self::KeyMapping(_) => StorageErrorKind::KeyMapping,
            Self::Dev(_) => StorageErrorKind::Dev,
        }
    }

    /// Whether the medium simply has no data yet
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Read-path conversion: a mapping failure means the payload is malformed
pub(crate) fn decode_error(err: MappingError) -> StorageError {
    StorageError::decode(err)
}

/// Write-path conversion: a mapping failure means the value cannot be written
pub(crate) fn encode_error(err: MappingError) -> StorageError {
    StorageError::encode(err)
}
