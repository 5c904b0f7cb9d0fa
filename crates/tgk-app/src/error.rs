//! Error types for the kit

use crate::config::ConfigError;
use tgk_flags::FlagsError;
use tgk_storage::StorageError;

/// Result type for kit operations
pub type Result<T, E = KitError> = std::result::Result<T, E>;

/// Errors raised while assembling or driving the kit
#[derive(Debug, thiserror::Error)]
pub enum KitError {
    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A registry or uploader failed
    #[error(transparent)]
    Flags(#[from] FlagsError),

    /// A storage could not be built or read
    #[error(transparent)]
    Storage(#[from] StorageError),
}
