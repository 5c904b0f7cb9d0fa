//! Explicit-key object mapping
//!
//! Every [`Mappable`] type names the exact keys it reads and writes through an
//! enum implementing [`MappingKeys`]. Unknown keys in the input are ignored;
//! missing required keys fail with [`MappingError::MissingKey`].

use crate::error::MappingError;
use crate::value::MapValue;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Enumeration of the JSON keys a type maps
pub trait MappingKeys: Copy {
    /// The JSON key string
    fn key(self) -> &'static str;
}

/// Declare a [`MappingKeys`] enum from `Variant => "json_key"` pairs
///
/// ```rust
/// tgk_mapping::mapping_keys! {
///     /// Keys of a team
///     pub enum TeamKeys {
///         Id => "id",
///         ShortName => "short_name",
///     }
/// }
/// use tgk_mapping::MappingKeys;
/// assert_eq!(TeamKeys::ShortName.key(), "short_name");
/// ```
#[macro_export]
macro_rules! mapping_keys {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::MappingKeys for $name {
            fn key(self) -> &'static str {
                match self {
                    $(Self::$variant => $key),+
                }
            }
        }
    };
}

/// Type with an explicit JSON object representation
pub trait Mappable: Sized {
    /// Keys this type reads and writes
    type Keys: MappingKeys;

    /// Build the value from a JSON object
    ///
    /// # Errors
    /// Returns [`MappingError`] if a required key is missing or malformed
    fn in_map(mapper: &InMapper<'_, Self::Keys>) -> Result<Self, MappingError>;

    /// Write the value into a JSON object
    ///
    /// # Errors
    /// Returns [`MappingError`] if the value cannot be represented
    fn out_map(&self, mapper: &mut OutMapper<Self::Keys>) -> Result<(), MappingError>;
}

/// Read-side view over a JSON object
#[derive(Debug)]
pub struct InMapper<'a, K> {
    object: &'a Map<String, Value>,
    _keys: PhantomData<K>,
}

impl<'a, K: MappingKeys> InMapper<'a, K> {
    /// Wrap a JSON value, which must be an object
    ///
    /// # Errors
    /// [`MappingError::NotAnObject`] for any other JSON shape
    pub fn new(value: &'a Value) -> Result<Self, MappingError> {
        match value {
            Value::Object(object) => Ok(Self {
                object,
                _keys: PhantomData,
            }),
            other => Err(MappingError::NotAnObject(shape_of(other))),
        }
    }

    fn raw(&self, key: K) -> Result<&'a Value, MappingError> {
        match self.object.get(key.key()) {
            None | Some(Value::Null) => Err(MappingError::MissingKey(key.key())),
            Some(value) => Ok(value),
        }
    }

    /// Map a required leaf value
    ///
    /// # Errors
    /// Missing key or wrong shape
    pub fn map<T: MapValue>(&self, key: K) -> Result<T, MappingError> {
        let raw = self.raw(key)?;
        T::from_json(raw).ok_or_else(|| MappingError::wrong_type(key.key(), T::EXPECTED))
    }

    /// Map an optional leaf value
    ///
    /// Absent, null and malformed values all come back as `None`.
    #[must_use]
    pub fn map_optional<T: MapValue>(&self, key: K) -> Option<T> {
        self.map(key).ok()
    }

    /// Map a required nested object
    ///
    /// # Errors
    /// Missing key or any error of the nested mapping
    pub fn map_nested<T: Mappable>(&self, key: K) -> Result<T, MappingError> {
        from_json(self.raw(key)?)
    }

    /// Map an optional nested object, `None` on any failure
    #[must_use]
    pub fn map_nested_optional<T: Mappable>(&self, key: K) -> Option<T> {
        self.map_nested(key).ok()
    }

    /// Map a required array of nested objects
    ///
    /// # Errors
    /// Missing key, non-array value, or the first failing element
    pub fn map_nested_array<T: Mappable>(&self, key: K) -> Result<Vec<T>, MappingError> {
        self.raw(key)?
            .as_array()
            .ok_or_else(|| MappingError::wrong_type(key.key(), "array"))?
            .iter()
            .map(from_json)
            .collect()
    }
}

/// Write-side builder for a JSON object
#[derive(Debug)]
pub struct OutMapper<K> {
    object: Map<String, Value>,
    _keys: PhantomData<K>,
}

impl<K: MappingKeys> Default for OutMapper<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MappingKeys> OutMapper<K> {
    /// Start an empty object
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            object: Map::new(),
            _keys: PhantomData,
        }
    }

    /// Write a leaf value
    pub fn map<T: MapValue>(&mut self, value: &T, key: K) {
        self.object.insert(key.key().to_owned(), value.to_json());
    }

    /// Write an optional leaf value, skipping `None`
    pub fn map_optional<T: MapValue>(&mut self, value: Option<&T>, key: K) {
        if let Some(value) = value {
            self.map(value, key);
        }
    }

    /// Write a nested object
    ///
    /// # Errors
    /// Any error of the nested mapping
    pub fn map_nested<T: Mappable>(&mut self, value: &T, key: K) -> Result<(), MappingError> {
        let nested = to_json(value)?;
        self.object.insert(key.key().to_owned(), nested);
        Ok(())
    }

    /// Write an array of nested objects
    ///
    /// # Errors
    /// The first failing element
    pub fn map_nested_array<T: Mappable>(
        &mut self,
        values: &[T],
        key: K,
    ) -> Result<(), MappingError> {
        let array = values.iter().map(to_json).collect::<Result<Vec<_>, _>>()?;
        self.object.insert(key.key().to_owned(), Value::Array(array));
        Ok(())
    }

    /// Finish the object
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }
}

/// Decode a [`Mappable`] value from JSON
///
/// # Errors
/// Returns [`MappingError`] if the JSON does not match the declared keys
pub fn from_json<T: Mappable>(value: &Value) -> Result<T, MappingError> {
    let mapper = InMapper::<T::Keys>::new(value)?;
    T::in_map(&mapper)
}

/// Encode a [`Mappable`] value to JSON
///
/// # Errors
/// Returns [`MappingError`] if the value cannot be represented
pub fn to_json<T: Mappable>(value: &T) -> Result<Value, MappingError> {
    let mut mapper = OutMapper::<T::Keys>::new();
    value.out_map(&mut mapper)?;
    Ok(mapper.into_value())
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
