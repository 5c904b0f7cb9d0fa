//! Boxed id sets
//!
//! A set of ids travels as `{"ids": [...]}`. Ids are written in ascending
//! order so equal sets always produce identical bytes.

use crate::error::MappingError;
use crate::mapper::{InMapper, Mappable, OutMapper};
use crate::value::MapValue;
use std::collections::HashSet;
use std::hash::Hash;

crate::mapping_keys! {
    /// Keys of a boxed set
    pub enum BoxedSetKeys {
        Ids => "ids",
    }
}

/// A set of ids wrapped in a JSON object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxedSet<Id: Eq + Hash>(pub HashSet<Id>);

impl<Id: Eq + Hash> BoxedSet<Id> {
    /// Unwrap the set
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> HashSet<Id> {
        self.0
    }
}

impl<Id: Eq + Hash> Default for BoxedSet<Id> {
    fn default() -> Self {
        Self(HashSet::new())
    }
}

impl<Id: Eq + Hash> From<HashSet<Id>> for BoxedSet<Id> {
    fn from(set: HashSet<Id>) -> Self {
        Self(set)
    }
}

impl<Id> Mappable for BoxedSet<Id>
where
    Id: MapValue + Eq + Hash + Ord + Clone,
{
    type Keys = BoxedSetKeys;

    fn in_map(mapper: &InMapper<'_, BoxedSetKeys>) -> Result<Self, MappingError> {
        let ids: Vec<Id> = mapper.map(BoxedSetKeys::Ids)?;
        Ok(Self(ids.into_iter().collect()))
    }

    fn out_map(&self, mapper: &mut OutMapper<BoxedSetKeys>) -> Result<(), MappingError> {
        let mut ids: Vec<Id> = self.0.iter().cloned().collect();
        ids.sort_unstable();
        mapper.map(&ids, BoxedSetKeys::Ids);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{from_json, to_json};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn writes_sorted_ids() {
        let set = BoxedSet(HashSet::from([42_i64, 7, 13]));
        assert_eq!(to_json(&set).unwrap(), json!({"ids": [7, 13, 42]}));
    }

    #[test]
    fn reads_unsorted_ids_with_duplicates() {
        let set: BoxedSet<i64> = from_json(&json!({"ids": [13, 7, 13]})).unwrap();
        assert_eq!(set.into_inner(), HashSet::from([7, 13]));
    }

    #[test]
    fn missing_ids_key_is_an_error() {
        let err = from_json::<BoxedSet<i64>>(&json!({"values": []})).unwrap_err();
        assert_eq!(err, MappingError::MissingKey("ids"));
    }

    proptest! {
        #[test]
        fn snapshot_survives_json(ids in proptest::collection::hash_set(any::<i64>(), 0..32)) {
            let set = BoxedSet(ids.clone());
            let text = serde_json::to_string(&to_json(&set).unwrap()).unwrap();
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            let back: BoxedSet<i64> = from_json(&value).unwrap();
            prop_assert_eq!(back.into_inner(), ids);
        }
    }
}
