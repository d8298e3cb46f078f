//! Session identifiers.

use serde::Serialize;
use std::borrow::Borrow;
use uuid::Uuid;

/// Unique identifier for a session.
///
/// Rendered as 32 lowercase hex digits (UUID v4, simple form). Every
/// character is unreserved in a URL query, so the value a client reads out of
/// the handshake is byte-for-byte the value it posts back and lookups are
/// plain equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets the registry look up `&str` keys without allocating.
impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
