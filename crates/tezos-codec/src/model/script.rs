//! Contract call parameters, scripts and entrypoints.
//!
//! Micheline expressions are carried as their already-serialized binary
//! form; this crate never interprets them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;
use crate::limits::MAX_ENTRYPOINT_LEN;
use crate::model::bytes::HexBytes;

/// Binary-encoded Micheline expression.
pub type Micheline = HexBytes;

const DEFAULT_ENTRYPOINT: &str = "default";

/// Entrypoints with a dedicated one-byte tag.
const RESERVED_ENTRYPOINTS: [&str; 10] = [
    DEFAULT_ENTRYPOINT,
    "root",
    "do",
    "set_delegate",
    "remove_delegate",
    "deposit",
    "stake",
    "unstake",
    "finalize_unstake",
    "set_delegate_parameters",
];

/// Tag of an entrypoint given by name.
pub const NAMED_ENTRYPOINT_TAG: u8 = 0xff;

/// A contract entrypoint name, at most 31 ASCII characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entrypoint(String);

impl Entrypoint {
    pub fn new(name: &str) -> Result<Self, ParseError> {
        if name.is_empty() {
            return Ok(Self::default());
        }
        if name.len() > MAX_ENTRYPOINT_LEN || !name.is_ascii() {
            return Err(ParseError::InvalidEntrypoint(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_ENTRYPOINT
    }

    /// Returns the reserved tag, or `NAMED_ENTRYPOINT_TAG` for custom names.
    pub fn tag(&self) -> u8 {
        RESERVED_ENTRYPOINTS
            .iter()
            .position(|name| *name == self.0)
            .map_or(NAMED_ENTRYPOINT_TAG, |i| i as u8)
    }

    /// Resolves a reserved tag back to its name.
    pub fn from_tag(tag: u8) -> Option<Self> {
        RESERVED_ENTRYPOINTS
            .get(tag as usize)
            .map(|name| Self((*name).to_string()))
    }
}

impl Default for Entrypoint {
    fn default() -> Self {
        Self(DEFAULT_ENTRYPOINT.to_string())
    }
}

impl fmt::Display for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Entrypoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Entrypoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Entrypoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Parameters of a contract call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Parameters {
    pub entrypoint: Entrypoint,
    pub value: Micheline,
}

/// Code and initial storage of an originated contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Script {
    pub code: Micheline,
    pub storage: Micheline,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_tags() {
        assert_eq!(Entrypoint::default().tag(), 0);
        assert_eq!(Entrypoint::new("remove_delegate").unwrap().tag(), 4);
        assert_eq!(Entrypoint::new("set_delegate_parameters").unwrap().tag(), 9);
        assert_eq!(Entrypoint::new("B").unwrap().tag(), NAMED_ENTRYPOINT_TAG);
        assert_eq!(Entrypoint::from_tag(6).unwrap().as_str(), "stake");
        assert!(Entrypoint::from_tag(10).is_none());
    }

    #[test]
    fn test_name_limits() {
        assert!(Entrypoint::new(&"a".repeat(31)).is_ok());
        assert!(Entrypoint::new(&"a".repeat(32)).is_err());
        assert!(Entrypoint::new("caf\u{e9}").is_err());
        assert!(Entrypoint::new("").unwrap().is_default());
    }
}
