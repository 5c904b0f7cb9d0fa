//! TGK App
//!
//! Configuration, logging and the composition root tying the storage,
//! consistency and flags crates into one process.
//!
//! # Core Concepts
//!
//! - **`KitConfig`**: directories, cache capacity, logging and push token, from TOML
//! - **`logging::init`**: installs the `tracing` subscriber once
//! - **`Kit`**: builds every long-lived component from a `KitConfig`
//!
//! # Example
//!
//! ```rust,no_run
//! use tgk_app::prelude::*;
//! use tgk_event::Dispatcher;
//! use tgk_models::TeamId;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = KitConfig::load("tgk.toml")?;
//! tgk_app::logging::init(&config.log_filter, config.log_format);
//!
//! let kit = Kit::new(config, Dispatcher::current()?)?;
//! kit.load().await?;
//! let _wiring = kit.start();
//! kit.launch();
//!
//! kit.favorite_teams().registry().update_presence(TeamId(4), true).await?;
//! kit.settle().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod kit;
pub mod logging;

pub use config::{ConfigError, KitConfig, LogFormat};
pub use error::{KitError, Result};
pub use kit::Kit;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for embedding the kit
    pub use crate::config::{ConfigError, KitConfig, LogFormat};
    pub use crate::error::KitError;
    pub use crate::kit::Kit;
}
