//! Validated identifier newtypes.

use crate::errors::IdentifierError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static BRICK_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@[a-z0-9][a-z0-9._~-]*/)?[a-z0-9][a-z0-9._~/-]*$").expect("valid brick id pattern")
});

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern"));

/// A registry id such as `@pixiebrix/retry`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BrickId(String);

impl BrickId {
    /// Parses and validates a brick id.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError` if the id is not a lowercase, optionally
    /// `@scope/`-prefixed registry id.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if BRICK_ID_PATTERN.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(IdentifierError::new(value, "brick id"))
        }
    }

    /// Builds an id from a constant known to be valid.
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(BRICK_ID_PATTERN.is_match(value), "invalid built-in brick id {value}");
        Self(value.to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BrickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BrickId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BrickId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for BrickId {
    type Error = IdentifierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<BrickId> for String {
    fn from(id: BrickId) -> Self {
        id.0
    }
}

/// The name a step's output is bound under, without the leading `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutputKey(String);

impl OutputKey {
    /// Parses an output key, accepting an optional leading `@`.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierError` if the remainder is not an identifier.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let raw = value.as_ref();
        let name = raw.strip_prefix('@').unwrap_or(raw);
        if IDENTIFIER_PATTERN.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(IdentifierError::new(raw, "output key"))
        }
    }

    /// Returns the bare name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the context root this key binds, e.g. `@result`.
    #[must_use]
    pub fn context_key(&self) -> String {
        format!("@{}", self.0)
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OutputKey {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for OutputKey {
    type Error = IdentifierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<OutputKey> for String {
    fn from(key: OutputKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brick_id_accepts_scoped_ids() {
        assert!(BrickId::parse("@pixiebrix/retry").is_ok());
        assert!(BrickId::parse("@pixiebrix/for-each").is_ok());
        assert!(BrickId::parse("@acme/forms/submit.v2").is_ok());
        assert!(BrickId::parse("local-brick").is_ok());
    }

    #[test]
    fn test_brick_id_rejects_malformed_ids() {
        assert!(BrickId::parse("").is_err());
        assert!(BrickId::parse("@pixiebrix/").is_err());
        assert!(BrickId::parse("@PixieBrix/Retry").is_err());
        assert!(BrickId::parse("has space").is_err());
    }

    #[test]
    fn test_brick_id_serde() {
        let id: BrickId = serde_json::from_str(r#""@test/echo""#).unwrap();
        assert_eq!(id.as_str(), "@test/echo");
        assert!(serde_json::from_str::<BrickId>(r#""Not An Id""#).is_err());
    }

    #[test]
    fn test_output_key_strips_at_prefix() {
        let key = OutputKey::parse("@result").unwrap();
        assert_eq!(key.as_str(), "result");
        assert_eq!(key.context_key(), "@result");

        let key = OutputKey::parse("_private1").unwrap();
        assert_eq!(key.context_key(), "@_private1");
    }

    #[test]
    fn test_output_key_rejects_non_identifiers() {
        assert!(OutputKey::parse("1st").is_err());
        assert!(OutputKey::parse("my-key").is_err());
        assert!(OutputKey::parse("@").is_err());
        assert!(OutputKey::parse("a.b").is_err());
    }
}
