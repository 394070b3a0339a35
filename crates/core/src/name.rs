// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client names.
//!
//! A name identifies a remote identity (worker, repository or server) and is
//! used as the file name of its certificate, so it is restricted to a
//! conservative character set: a leading ASCII letter followed by letters,
//! digits, `_` or `-`.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The minimum number of characters in a name
pub const NAME_MIN_LENGTH: usize = 3;

/// The maximum number of characters in a name
pub const NAME_MAX_LENGTH: usize = 35;

/// Rejected names and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid name {0:?}: must start with a letter, contain only letters, digits, '_' or '-', and be {NAME_MIN_LENGTH}-{NAME_MAX_LENGTH} characters long")]
    InvalidName(String),

    #[error("invalid public key: {0}")]
    InvalidKey(String),

    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),
}

/// Returns `true` if `name` is acceptable as a client or certificate name.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (NAME_MIN_LENGTH..=NAME_MAX_LENGTH).contains(&name.len())
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A validated client name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientName(String);

impl ClientName {
    /// Validate and wrap `name`.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if is_valid_name(&name) {
            Ok(Self(name))
        } else {
            Err(ValidationError::InvalidName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ClientName {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ClientName> for String {
    fn from(name: ClientName) -> Self {
        name.0
    }
}

impl PartialEq<str> for ClientName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ClientName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for ClientName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
