//! Identities for tabs and asynchronous requests

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TableRef;

/// Identifier of an open tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag attached to an asynchronous load at issue time.
///
/// A response is only applied if the token still matches the context that is
/// current when it arrives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub connection_id: Option<String>,
    pub generation: u64,
    pub target: Option<TableRef>,
}

impl RequestToken {
    pub fn new(connection_id: Option<String>, generation: u64, target: Option<TableRef>) -> Self {
        Self {
            connection_id,
            generation,
            target,
        }
    }

    /// True if `other` was issued for the same connection, generation and table
    pub fn matches(&self, other: &RequestToken) -> bool {
        self == other
    }
}
