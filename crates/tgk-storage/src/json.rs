//! JSON value adapters
//!
//! Three stacked conversions turn a byte storage into a typed one:
//! - `map_json`: bytes and [`serde_json::Value`]
//! - `map_mappable`: `Value` and any [`Mappable`] type
//! - `map_boxed_set`: `Value` and a `HashSet` stored as `{"ids": [...]}`
//!
//! Mapping failures become `Decode` on reads and `Encode` on writes.

use crate::error::{decode_error, encode_error, Result};
use crate::ext::StorageExt;
use crate::storage::NamedStorage;
use crate::values::MapValues;
use serde_json::Value;
use std::collections::HashSet;
use std::hash::Hash;
use tgk_mapping::{from_json, to_json, BoxedSet, MapValue, Mappable, MappingError};

/// Value conversion used by the JSON adapters
pub type ConvertFn<From, To> = fn(From) -> Result<To>;

/// Storage of JSON values over a byte storage
pub type JsonStorage<S> = MapValues<S, ConvertFn<Vec<u8>, Value>, ConvertFn<Value, Vec<u8>>, Vec<u8>>;

/// Storage of mappable values over a JSON storage
pub type MappableStorage<S, T> = MapValues<S, ConvertFn<Value, T>, ConvertFn<T, Value>, Value>;

/// Storage of id sets over a JSON storage
pub type BoxedSetStorage<S, Id> =
    MapValues<S, ConvertFn<Value, HashSet<Id>>, ConvertFn<HashSet<Id>, Value>, Value>;

fn bytes_to_json(bytes: Vec<u8>) -> Result<Value> {
    serde_json::from_slice(&bytes).map_err(|err| decode_error(MappingError::from(err)))
}

fn json_to_bytes(value: Value) -> Result<Vec<u8>> {
    serde_json::to_vec(&value).map_err(|err| encode_error(MappingError::from(err)))
}

fn json_to_mappable<T: Mappable>(value: Value) -> Result<T> {
    from_json(&value).map_err(decode_error)
}

fn mappable_to_json<T: Mappable>(value: T) -> Result<Value> {
    to_json(&value).map_err(encode_error)
}

fn json_to_set<Id>(value: Value) -> Result<HashSet<Id>>
where
    Id: MapValue + Eq + Hash + Ord + Clone,
{
    from_json::<BoxedSet<Id>>(&value)
        .map(BoxedSet::into_inner)
        .map_err(decode_error)
}

fn set_to_json<Id>(set: HashSet<Id>) -> Result<Value>
where
    Id: MapValue + Eq + Hash + Ord + Clone,
{
    to_json(&BoxedSet(set)).map_err(encode_error)
}

/// JSON combinators
pub trait JsonStorageExt: NamedStorage + Sized {
    /// Parse stored bytes as JSON
    #[inline]
    fn map_json(self) -> JsonStorage<Self> {
        self.map_values(
            bytes_to_json as ConvertFn<Vec<u8>, Value>,
            json_to_bytes as ConvertFn<Value, Vec<u8>>,
        )
    }

    /// Convert stored JSON to `T`
    #[inline]
    fn map_mappable<T: Mappable>(self) -> MappableStorage<Self, T> {
        self.map_values(
            json_to_mappable::<T> as ConvertFn<Value, T>,
            mappable_to_json::<T> as ConvertFn<T, Value>,
        )
    }

    /// Convert stored JSON to a set of ids
    #[inline]
    fn map_boxed_set<Id>(self) -> BoxedSetStorage<Self, Id>
    where
        Id: MapValue + Eq + Hash + Ord + Clone,
    {
        self.map_values(
            json_to_set::<Id> as ConvertFn<Value, HashSet<Id>>,
            set_to_json::<Id> as ConvertFn<HashSet<Id>, Value>,
        )
    }
}

impl<S: NamedStorage> JsonStorageExt for S {}
