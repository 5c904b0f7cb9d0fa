//! Flag descriptors
//!
//! A descriptor ties an id type to the names under which its set is
//! persisted and uploaded.

use std::fmt::Debug;
use std::hash::Hash;
use tgk_mapping::MapValue;
use tgk_models::{MatchId, TeamId};
use tgk_storage::{Filename, Result};

/// Bounds of an id stored in a flag set
pub trait FlagId: MapValue + Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static {}

impl<T: MapValue + Copy + Eq + Hash + Ord + Debug + Send + Sync + 'static> FlagId for T {}

/// Describes one kind of flag
pub trait FlagDescriptor: Send + Sync + 'static {
    /// Flagged id type
    type Id: FlagId;

    /// Stable name, used for file names and diagnostics
    const NAME: &'static str;

    /// File holding the flagged set
    ///
    /// # Errors
    /// `KeyMapping` if `NAME` is not a valid file name
    fn filename() -> Result<Filename> {
        Filename::new(format!("{}.json", Self::NAME))
    }

    /// File holding the last uploaded set
    ///
    /// # Errors
    /// `KeyMapping` if `NAME` is not a valid file name
    fn keeper_filename() -> Result<Filename> {
        Filename::new(format!("keeper-notifications-{}", Self::NAME))
    }
}

/// Teams the user follows
#[derive(Debug, Clone, Copy)]
pub struct FavoriteTeams;

impl FlagDescriptor for FavoriteTeams {
    type Id = TeamId;
    const NAME: &'static str = "favorite-teams";
}

/// Matches the user follows
#[derive(Debug, Clone, Copy)]
pub struct FavoriteMatches;

impl FlagDescriptor for FavoriteMatches {
    type Id = MatchId;
    const NAME: &'static str = "favorite-matches";
}

/// Matches muted for notifications despite a favorite team
#[derive(Debug, Clone, Copy)]
pub struct UnsubscribedMatches;

impl FlagDescriptor for UnsubscribedMatches {
    type Id = MatchId;
    const NAME: &'static str = "unsubscribed-matches";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_descriptor_name() {
        assert_eq!(FavoriteTeams::filename().unwrap().as_str(), "favorite-teams.json");
        assert_eq!(
            FavoriteMatches::keeper_filename().unwrap().as_str(),
            "keeper-notifications-favorite-matches"
        );
    }
}
