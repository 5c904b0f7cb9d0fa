//! TGK Models
//!
//! Tournament payloads and the matches API point.
//!
//! # Core Concepts
//!
//! - **`TeamId` / `MatchId`**: integer identifiers, the ids stored in flag sets
//! - **`MatchCompact` / `MatchFull`**: schedule entries with optional scores
//! - **`Editioned<T>`**: payload tagged with its publication edition
//! - **`MatchesApi`**: typed retrieves over a byte provider keyed by `ApiPath`

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod api;
pub mod editioned;
pub mod ids;
pub mod matches;

pub use api::{ApiPath, MatchesApi, MatchesEndpoint};
pub use editioned::Editioned;
pub use ids::{MatchId, TeamId};
pub use matches::{
    EventKind, FullMatches, MatchCompact, MatchEvent, MatchFull, MatchTeam, Matches, Score, Stage,
    Stages,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for domain models
    pub use crate::api::{ApiPath, MatchesApi, MatchesEndpoint};
    pub use crate::editioned::Editioned;
    pub use crate::ids::{MatchId, TeamId};
    pub use crate::matches::{MatchCompact, MatchFull, Matches, Score, Stage, Stages};
}
