//! Flag sets and change records

use std::collections::HashSet;
use std::hash::Hash;

/// Presence change of one id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Change<Id> {
    /// Affected id
    pub id: Id,
    /// Whether the id is flagged after the change
    pub is_present: bool,
}

impl<Id> Change<Id> {
    /// Create change
    #[inline]
    #[must_use]
    pub fn new(id: Id, is_present: bool) -> Self {
        Self { id, is_present }
    }

    /// The change undoing this one
    #[inline]
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            id: self.id,
            is_present: !self.is_present,
        }
    }
}

/// Set of flagged ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagsSet<Id: Eq + Hash> {
    set: HashSet<Id>,
}

impl<Id: Eq + Hash> Default for FlagsSet<Id> {
    fn default() -> Self {
        Self {
            set: HashSet::new(),
        }
    }
}

impl<Id: Eq + Hash> From<HashSet<Id>> for FlagsSet<Id> {
    fn from(set: HashSet<Id>) -> Self {
        Self { set }
    }
}

impl<Id: Eq + Hash + Clone> FlagsSet<Id> {
    /// Whether `id` is flagged
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &Id) -> bool {
        self.set.contains(id)
    }

    /// Apply `change`, returning whether the set changed
    pub fn apply(&mut self, change: &Change<Id>) -> bool {
        if change.is_present {
            self.set.insert(change.id.clone())
        } else {
            self.set.remove(&change.id)
        }
    }

    /// Number of flagged ids
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether nothing is flagged
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Flagged ids
    #[inline]
    #[must_use]
    pub fn as_set(&self) -> &HashSet<Id> {
        &self.set
    }

    /// Unwrap the set
    #[inline]
    #[must_use]
    pub fn into_set(self) -> HashSet<Id> {
        self.set
    }
}

/// Registry notification: the new set and, for single-id mutations, the change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryUpdate<Id: Eq + Hash> {
    /// Flags after the update
    pub flags: FlagsSet<Id>,
    /// The mutation, `None` for wholesale replacement or loading
    pub change: Option<Change<Id>>,
}
