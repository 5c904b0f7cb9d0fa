//! TGK Flags
//!
//! Favorite teams and matches: the persisted registry, the uploader sending
//! them to the notifications backend, and the keeper reconciling the two.
//!
//! # Core Concepts
//!
//! - **`FlagDescriptor`**: names an id type and the files its set lives in
//! - **`FlagsRegistry<D>`**: in-memory set, persisted after every mutation
//! - **`FlagsUploader<D>`**: sends the full set with device id and push token
//! - **`Flags<D>`**: registry + uploader + consistency keeper, wired together
//! - **`TokenUploader`**: keeps the push token registered
//!
//! # Architecture
//!
//! ```text
//! update_presence ──► FlagsRegistry ──did_update──► FlagsUploader ──► pusher
//!                          │                              │
//!                       latest                       did_upload
//!                          ▼                              ▼
//!      trigger ──► UploadConsistencyKeeper ◄── snapshot (keeper-notifications-*)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tgk_flags::prelude::*;
//! use tgk_models::TeamId;
//! use tgk_storage::FileSystemStorage;
//!
//! # async fn run() -> tgk_flags::Result<()> {
//! let registry = FlagsRegistry::<FavoriteTeams>::in_directory(FileSystemStorage::new("/tmp/tgk"))?;
//! registry.load().await?;
//! registry.update_presence(TeamId(4), true).await?;
//! assert!(registry.is_present(&TeamId(4)));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod descriptor;
pub mod error;
pub mod flags;
pub mod registry;
pub mod set;
pub mod token;
pub mod uploader;

pub use descriptor::{FavoriteMatches, FavoriteTeams, FlagDescriptor, FlagId, UnsubscribedMatches};
pub use error::{FlagsError, Result};
pub use flags::Flags;
pub use registry::FlagsRegistry;
pub use set::{Change, FlagsSet, RegistryUpdate};
pub use token::{DeviceIdentifier, PushToken, TokenUpload, TokenUploader, TOKEN_KEEPER_NAME};
pub use uploader::{FavoritesUpload, FlagsUploader, UploadFailure};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for flag features
    pub use crate::descriptor::{FavoriteMatches, FavoriteTeams, FlagDescriptor, UnsubscribedMatches};
    pub use crate::error::{FlagsError, Result};
    pub use crate::flags::Flags;
    pub use crate::registry::FlagsRegistry;
    pub use crate::set::{Change, FlagsSet, RegistryUpdate};
    pub use crate::token::{PushToken, TokenUploader};
    pub use crate::uploader::{FlagsUploader, UploadFailure};
}
