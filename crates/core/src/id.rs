// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier type.
//!
//! Session ids are minted by the relay as `sess_` followed by eight lowercase
//! hex characters, and stay stable across persistence and recovery.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

const HEX: [char; 16] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f'];

/// Unique identifier for a debug session, of the form `sess_<8 hex>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub const PREFIX: &'static str = "sess_";

    /// Mint a new random session id.
    pub fn mint() -> Self {
        Self(format!("{}{}", Self::PREFIX, nanoid::nanoid!(8, &HEX)))
    }

    /// Wrap an existing id string (for deserialization and recovery).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Whether the string has the `sess_<8 hex>` shape.
    pub fn is_well_formed(s: &str) -> bool {
        match s.strip_prefix(Self::PREFIX) {
            Some(rest) => {
                rest.len() == 8 && rest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase())
            }
            None => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for SessionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SessionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
