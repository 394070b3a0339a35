// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer authorization.

use std::path::PathBuf;

use tracing::{debug, warn};
use x25519_dalek::PublicKey;

use super::identity::find_by_key;
use super::AuthError;

/// Decides whether a peer presenting a public key may connect.
#[derive(Debug)]
pub enum Authenticator {
    /// Only keys with an identity file in the directory are accepted.
    ///
    /// The directory is read on every check, so identities saved after
    /// startup take effect immediately.
    AllowList { remotes_dir: PathBuf },
    /// Every key is accepted
    AllowAny,
}

impl Authenticator {
    /// Returns the name bound to `key`, if the allow-list names one.
    pub fn authenticate(&self, key: &PublicKey) -> Result<Option<String>, AuthError> {
        match self {
            Authenticator::AllowAny => {
                warn!(key = %hex::encode(key.as_bytes()), "accepting unauthenticated peer key");
                Ok(None)
            }
            Authenticator::AllowList { remotes_dir } => match find_by_key(remotes_dir, key)? {
                Some(identity) => {
                    debug!(name = identity.name(), "peer key authorized");
                    Ok(Some(identity.name().to_string()))
                }
                None => Err(AuthError::Rejected(hex::encode(key.as_bytes()))),
            },
        }
    }

    pub fn is_allow_any(&self) -> bool {
        matches!(self, Authenticator::AllowAny)
    }
}
