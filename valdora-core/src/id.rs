//! Entity identifiers.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;

/// Identifier of an entity inside its collection.
///
/// Identifiers travel as strings, but the wire may carry them as numbers too;
/// both forms deserialize into the same `EntityId`.
///
/// ```
/// use valdora_core::EntityId;
///
/// let from_number: EntityId = serde_json::from_str("42").unwrap();
/// let from_string: EntityId = serde_json::from_str("\"42\"").unwrap();
/// assert_eq!(from_number, from_string);
/// assert_eq!(from_number.as_str(), "42");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(SmolStr);

impl EntityId {
    /// Creates an identifier from anything string-like.
    #[inline]
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EntityId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(SmolStr::new(s))
    }
}

impl From<String> for EntityId {
    #[inline]
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}

impl From<u64> for EntityId {
    #[inline]
    fn from(n: u64) -> Self {
        Self(SmolStr::from(n.to_string()))
    }
}

impl AsRef<str> for EntityId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(SmolStr),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => EntityId(s),
            Raw::Number(n) => EntityId::from(n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_conversions() {
        assert_eq!(EntityId::from(7u64).to_string(), "7");
        assert_eq!(EntityId::from("tenant-1").as_str(), "tenant-1");
        assert_eq!(EntityId::from(String::from("x")), EntityId::new("x"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&EntityId::from(12u64)).unwrap();
        assert_eq!(json, "\"12\"");
    }
}
