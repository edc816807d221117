//! Strongly-typed session identifier with a strict grammar.
//!
//! A [`SessionId`] is always a canonical 36-character UUID. The grammar is
//! checked before an id is ever used to build a filesystem path, which is the
//! primary defense against path traversal through caller-supplied ids.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RecorderError;

/// Identifier of one recording session. Uses `Arc<str>` internally so
/// cloning is an atomic increment instead of a heap allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(Arc<str>);

impl SessionId {
    /// Generate a fresh random (v4 UUID) session id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string().into())
    }

    /// Parse a caller-supplied id, enforcing the canonical UUID layout.
    ///
    /// # Errors
    ///
    /// Returns a validation error for anything that is not 36 characters of
    /// hex digits and hyphens in the 8-4-4-4-12 layout. No filesystem or
    /// registry access happens before this check.
    pub fn parse(s: &str) -> Result<Self, RecorderError> {
        if is_valid_session_id(s) {
            Ok(Self(Arc::from(s)))
        } else {
            Err(RecorderError::Validation {
                reason: format!("malformed session id: {s:?}"),
            })
        }
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check the canonical UUID layout: exactly 36 bytes, hyphens at offsets
/// 8/13/18/23, ASCII hex digits everywhere else.
pub fn is_valid_session_id(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }
    s.bytes().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for SessionId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SessionId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for SessionId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SessionId::parse(&s).map_err(serde::de::Error::custom)
    }
}
