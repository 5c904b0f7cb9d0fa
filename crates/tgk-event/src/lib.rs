//! TGK Event
//!
//! Local, typed publish/subscribe used to wire storages, registries and
//! consistency keepers together.
//!
//! # Core Concepts
//!
//! - **`Publisher<T>`**: synchronous fan-out in subscription order, no replay
//! - **`Subscribe<T>`**: derived streams (`map`, `filter`, `merge`, `on`, `delayed`)
//! - **`SerialQueue`**: ordered delivery context standing in for a main thread
//! - **`Lifecycle`**: launch and activation events, passed down explicitly
//!
//! # Example
//!
//! ```rust
//! use tgk_event::Publisher;
//!
//! let did_update = Publisher::<Vec<u32>>::new("did-update");
//! let sizes = did_update.proxy().map(|ids| ids.len());
//! sizes.subscribe(|n| println!("{n} favorites"));
//! did_update.publish(vec![7, 13]);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod publisher;
pub mod subscribe;

pub use dispatch::{Dispatcher, PendingTasks, SerialQueue};
pub use error::EventError;
pub use lifecycle::Lifecycle;
pub use publisher::{Publisher, Subscription};
pub use subscribe::Subscribe;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for event wiring
    pub use crate::dispatch::{Dispatcher, PendingTasks, SerialQueue};
    pub use crate::error::EventError;
    pub use crate::lifecycle::Lifecycle;
    pub use crate::publisher::{Publisher, Subscription};
    pub use crate::subscribe::Subscribe;
}
