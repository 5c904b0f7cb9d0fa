//! Typed identifiers

use serde_json::Value;
use std::fmt;
use tgk_mapping::MapValue;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $expected:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw numeric id
            #[inline]
            #[must_use]
            pub const fn raw(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl MapValue for $name {
            const EXPECTED: &'static str = $expected;

            fn from_json(value: &Value) -> Option<Self> {
                i64::from_json(value).map(Self)
            }

            fn to_json(&self) -> Value {
                Value::from(self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a national team
    TeamId,
    "team id"
);

id_type!(
    /// Identifier of a match
    MatchId,
    "match id"
);
