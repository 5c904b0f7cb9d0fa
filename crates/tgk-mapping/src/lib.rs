//! TGK Mapping
//!
//! Explicit-key JSON codecs for wire payloads and persisted snapshots.
//!
//! # Core Concepts
//!
//! - **`MapValue`**: a leaf converted to and from a single JSON node
//! - **`Mappable`**: an object type that names every key it reads and writes
//! - **`BoxedSet`**: an id set persisted as `{"ids": [...]}`
//!
//! Values are decoded from [`serde_json::Value`] trees, never through
//! reflection-style derives, so the wire shape of each type is visible in its
//! `in_map`/`out_map` pair.
//!
//! # Example
//!
//! ```rust
//! use tgk_mapping::prelude::*;
//!
//! tgk_mapping::mapping_keys! {
//!     enum TeamKeys { Id => "id", Name => "name" }
//! }
//!
//! struct Team { id: i64, name: String }
//!
//! impl Mappable for Team {
//!     type Keys = TeamKeys;
//!
//!     fn in_map(m: &InMapper<'_, TeamKeys>) -> Result<Self, MappingError> {
//!         Ok(Self { id: m.map(TeamKeys::Id)?, name: m.map(TeamKeys::Name)? })
//!     }
//!
//!     fn out_map(&self, m: &mut OutMapper<TeamKeys>) -> Result<(), MappingError> {
//!         m.map(&self.id, TeamKeys::Id);
//!         m.map(&self.name, TeamKeys::Name);
//!         Ok(())
//!     }
//! }
//!
//! let team: Team = from_json(&serde_json::json!({"id": 4, "name": "Norway"})).unwrap();
//! assert_eq!(team.name, "Norway");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod boxed;
pub mod error;
pub mod mapper;
pub mod value;

pub use boxed::{BoxedSet, BoxedSetKeys};
pub use error::MappingError;
pub use mapper::{from_json, to_json, InMapper, Mappable, MappingKeys, OutMapper};
pub use value::MapValue;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing codecs
    pub use crate::error::MappingError;
    pub use crate::mapper::{from_json, to_json, InMapper, Mappable, MappingKeys, OutMapper};
    pub use crate::value::MapValue;
}
