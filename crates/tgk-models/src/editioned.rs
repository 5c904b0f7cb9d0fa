//! Versioned API payloads

use tgk_mapping::{InMapper, Mappable, MappingError, OutMapper};

tgk_mapping::mapping_keys! {
    /// Keys of an editioned payload
    pub enum EditionedKeys {
        Edition => "edition",
        Content => "content",
    }
}

/// API content tagged with the edition it was published in
///
/// Wire shape: `{"edition": 3, "content": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Editioned<T> {
    /// Monotonic edition number of the payload
    pub edition: i64,
    /// The payload
    pub content: T,
}

impl<T: Mappable> Mappable for Editioned<T> {
    type Keys = EditionedKeys;

    fn in_map(mapper: &InMapper<'_, EditionedKeys>) -> Result<Self, MappingError> {
        Ok(Self {
            edition: mapper.map(EditionedKeys::Edition)?,
            content: mapper.map_nested(EditionedKeys::Content)?,
        })
    }

    fn out_map(&self, mapper: &mut OutMapper<EditionedKeys>) -> Result<(), MappingError> {
        mapper.map(&self.edition, EditionedKeys::Edition);
        mapper.map_nested(&self.content, EditionedKeys::Content)
    }
}
