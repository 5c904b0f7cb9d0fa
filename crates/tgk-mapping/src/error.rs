//! Error types for JSON mapping

/// Errors produced while mapping between JSON and typed values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// A required key is absent from the JSON object
    #[error("missing key: '{0}'")]
    MissingKey(&'static str),

    /// The key is present but holds a value of the wrong shape
    #[error("wrong type at '{key}': expected {expected}")]
    WrongType {
        /// Offending key
        key: &'static str,
        /// Human readable expected shape
        expected: &'static str,
    },

    /// The mapped value is not a JSON object
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// The type can only be written, never read back
    #[error("type {0} supports out-mapping only")]
    OutMapOnly(&'static str),

    /// Raw JSON text could not be parsed or produced
    #[error("json syntax error: {0}")]
    Syntax(String),
}

impl MappingError {
    /// Create a wrong-type error for key
    #[inline]
    #[must_use]
    pub fn wrong_type(key: &'static str, expected: &'static str) -> Self {
        Self::WrongType { key, expected }
    }
}

impl From<serde_json::Error> for MappingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Syntax(err.to_string())
    }
}
