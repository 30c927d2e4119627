//! Shared newtypes used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize
//! identically to the raw strings the backend sends, so they can be used
//! directly in wire types without conversion overhead.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

macro_rules! transparent_string_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok($name(s.to_string()))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok($name(s))
            }
        }
    };
}

transparent_string_newtype! {
    /// Newtype for ticker symbols (e.g. `"AAPL"`).
    Symbol
}

transparent_string_newtype! {
    /// Newtype for price-alert identifiers.
    AlertId
}

transparent_string_newtype! {
    /// Newtype for user identifiers, as minted by the backend.
    UserId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_serializes_as_plain_string() {
        let symbol = Symbol::new("AAPL");
        let json = serde_json::to_string(&symbol).unwrap();
        assert_eq!(json, "\"AAPL\"");
    }

    #[test]
    fn test_alert_id_roundtrip() {
        let id: AlertId = serde_json::from_str("\"u1_AAPL_1700000000\"").unwrap();
        assert_eq!(id.as_str(), "u1_AAPL_1700000000");
    }

    #[test]
    fn test_user_id_usable_as_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(UserId::new("u1"), 1);
        assert_eq!(map.get(&UserId::from("u1")), Some(&1));
    }
}
