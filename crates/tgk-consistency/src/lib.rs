//! TGK Consistency
//!
//! Keeps remotely uploaded state in line with local state without an explicit
//! retry loop.
//!
//! # Core Concepts
//!
//! - **`UploadConsistencyKeeper<T>`**: compares the latest local value with the
//!   last confirmed upload and calls `reupload` on divergence
//! - **`LocalModel<V>`**: a persisted value that announces successful writes
//!
//! # Architecture
//!
//! ```text
//! trigger ──► check ──► latest != last_uploaded ──► reupload(latest)
//!                                                        │
//! last_uploaded ◄── persist_uploaded ◄── did_upload ◄────┘
//! ```
//!
//! A failed upload never fires `did_upload`, so the snapshot keeps the old
//! value and the next trigger tries again.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod keeper;
pub mod local_model;

pub use keeper::{CheckOutcome, Reupload, UploadConsistencyKeeper};
pub use local_model::LocalModel;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for consistency keeping
    pub use crate::keeper::{CheckOutcome, Reupload, UploadConsistencyKeeper};
    pub use crate::local_model::LocalModel;
}
