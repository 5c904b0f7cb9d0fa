//! Matches API point
//!
//! The API is a read-only byte provider keyed by [`ApiPath`]. Everything
//! above it (JSON parsing, endpoint keys, typed payloads) is built from
//! storage combinators, so the provider can be the network, a disk mirror,
//! or both layered with `backed_by`.

use crate::editioned::Editioned;
use crate::ids::MatchId;
use crate::matches::{FullMatches, MatchFull, Matches, Stages};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tgk_storage::prelude::*;

/// Relative path of an API resource, segments joined with `/`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiPath(String);

impl ApiPath {
    /// Path from a raw string
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// `self/sub`
    #[must_use]
    pub fn join(&self, sub: &str) -> Self {
        if self.0.is_empty() {
            return Self::new(sub);
        }
        Self(format!("{}/{}", self.0.trim_end_matches('/'), sub.trim_start_matches('/')))
    }

    /// The path string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApiPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Resources under `matches/`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchesEndpoint {
    path: ApiPath,
}

impl MatchesEndpoint {
    fn new(sub: &str) -> Self {
        Self {
            path: ApiPath::new("matches").join(sub),
        }
    }

    /// `matches/all.json`
    #[must_use]
    pub fn all() -> Self {
        Self::new("all.json")
    }

    /// `matches/all-full.json`
    #[must_use]
    pub fn all_full() -> Self {
        Self::new("all-full.json")
    }

    /// `matches/<id>.json`
    #[must_use]
    pub fn full_match(id: MatchId) -> Self {
        Self::new(&format!("{id}.json"))
    }

    /// `matches/stages.json`
    #[must_use]
    pub fn stages() -> Self {
        Self::new("stages.json")
    }

    /// Resource path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ApiPath {
        &self.path
    }

    /// Consume into the resource path
    #[inline]
    #[must_use]
    pub fn into_path(self) -> ApiPath {
        self.path
    }
}

/// Typed read access to the matches resources
#[derive(Clone)]
pub struct MatchesApi {
    provider: ReadOnlyStorage<MatchesEndpoint, Value>,
    /// Compact schedule
    pub all: Retrieve<Editioned<Matches>>,
    /// Schedule with live feeds
    pub all_full: Retrieve<Editioned<FullMatches>>,
    /// Schedule grouped by stage
    pub stages: Retrieve<Editioned<Stages>>,
    /// One match with its live feed
    pub full_match: ReadOnlyStorage<MatchId, Editioned<MatchFull>>,
}

impl fmt::Debug for MatchesApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchesApi")
            .field("provider", &self.provider.storage_name())
            .finish_non_exhaustive()
    }
}

impl MatchesApi {
    /// Build the API on top of a byte provider
    #[must_use]
    pub fn new(data_provider: ReadOnlyStorage<ApiPath, Vec<u8>>) -> Self {
        let provider = data_provider
            .map_json()
            .map_keys(MatchesEndpoint::into_path)
            .read_only::<MatchesEndpoint, Value>();

        let all = Arc::clone(&provider)
            .single_key(MatchesEndpoint::all())
            .map_mappable::<Editioned<Matches>>()
            .read_only();
        let all_full = Arc::clone(&provider)
            .single_key(MatchesEndpoint::all_full())
            .map_mappable::<Editioned<FullMatches>>()
            .read_only();
        let stages = Arc::clone(&provider)
            .single_key(MatchesEndpoint::stages())
            .map_mappable::<Editioned<Stages>>()
            .read_only();
        let full_match = Arc::clone(&provider)
            .map_mappable::<Editioned<MatchFull>>()
            .map_keys(MatchesEndpoint::full_match)
            .read_only();

        Self {
            provider,
            all,
            all_full,
            stages,
            full_match,
        }
    }

    /// JSON of any matches endpoint
    #[must_use]
    pub fn provider(&self) -> &ReadOnlyStorage<MatchesEndpoint, Value> {
        &self.provider
    }
}
