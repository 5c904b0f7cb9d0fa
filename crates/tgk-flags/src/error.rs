//! Error types for flags and uploads

use tgk_storage::StorageError;

/// Result type for flag operations
pub type Result<T, E = FlagsError> = std::result::Result<T, E>;

/// Errors raised by registries and uploaders
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlagsError {
    /// Underlying storage failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The device has no identifier to upload under
    #[error("no device identifier available")]
    MissingDeviceIdentifier,

    /// Push token text is not valid hex
    #[error("invalid push token: {0}")]
    InvalidToken(String),
}
