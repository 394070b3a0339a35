// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keypairs and their on-disk form.
//!
//! A public identity file is TOML with the owner's name and a hex-encoded
//! X25519 public key. The secret key lives in a separate file readable only
//! by its owner.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tracing::warn;
use x25519_dalek::{PublicKey, StaticSecret};

use super::AuthError;

const KEY_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct PublicFile {
    name: String,
    public_key: String,
}

#[derive(Serialize, Deserialize)]
struct SecretFile {
    secret_key: String,
}

/// A named X25519 keypair, or just the public half for a remote peer.
#[derive(Clone)]
pub struct Identity {
    name: String,
    public: PublicKey,
    secret: Option<StaticSecret>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("public_key", &self.public_key_hex())
            .field("has_secret", &self.secret.is_some())
            .finish()
    }
}

impl Identity {
    /// Fresh keypair from the OS random source.
    pub fn generate(name: impl Into<String>) -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { name: name.into(), public, secret: Some(secret) }
    }

    pub fn from_public(name: impl Into<String>, public: PublicKey) -> Self {
        Self { name: name.into(), public, secret: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public.as_bytes())
    }

    pub fn secret(&self) -> Option<&StaticSecret> {
        self.secret.as_ref()
    }

    /// Load a public identity file, and the matching secret if `secret_path` is given.
    pub fn load(public_path: &Path, secret_path: Option<&Path>) -> Result<Self, AuthError> {
        let text = fs::read_to_string(public_path)?;
        let file: PublicFile = toml::from_str(&text).map_err(|e| AuthError::Malformed {
            path: public_path.to_path_buf(),
            message: e.to_string(),
        })?;
        let public = parse_public_key(&file.public_key)?;

        let secret = match secret_path {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                let file: SecretFile = toml::from_str(&text).map_err(|e| AuthError::Malformed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                let secret = StaticSecret::from(parse_key_bytes(&file.secret_key)?);
                if PublicKey::from(&secret) != public {
                    return Err(AuthError::Malformed {
                        path: path.to_path_buf(),
                        message: "secret key does not match public key".to_string(),
                    });
                }
                Some(secret)
            }
            None => None,
        };
        Ok(Self { name: file.name, public, secret })
    }

    /// Write the public half. Fails if `path` already exists.
    pub fn save_public(&self, path: &Path) -> Result<(), AuthError> {
        let file = PublicFile { name: self.name.clone(), public_key: self.public_key_hex() };
        let text = toml::to_string(&file).map_err(|e| AuthError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        write_new(path, text.as_bytes(), 0o644)
    }

    /// Write the secret half with owner-only permissions. Fails if `path` already exists.
    pub fn save_secret(&self, path: &Path) -> Result<(), AuthError> {
        let Some(secret) = &self.secret else {
            return Err(AuthError::NoSecret(self.name.clone()));
        };
        let file = SecretFile { secret_key: hex::encode(secret.to_bytes()) };
        let text = toml::to_string(&file).map_err(|e| AuthError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        write_new(path, text.as_bytes(), 0o600)
    }
}

fn write_new(path: &Path, contents: &[u8], mode: u32) -> Result<(), AuthError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => AuthError::AlreadyExists(path.to_path_buf()),
            _ => AuthError::Io(e),
        })?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

fn parse_key_bytes(text: &str) -> Result<[u8; KEY_LEN], AuthError> {
    let bytes = hex::decode(text.trim()).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
    <[u8; KEY_LEN]>::try_from(bytes.as_slice())
        .map_err(|_| AuthError::InvalidKey(format!("expected {KEY_LEN} bytes, got {}", bytes.len())))
}

/// Parse a hex-encoded X25519 public key.
pub fn parse_public_key(text: &str) -> Result<PublicKey, AuthError> {
    parse_key_bytes(text).map(PublicKey::from)
}

/// Find the identity file in `dir` whose public key is `key`.
///
/// Files that fail to load are logged and skipped.
pub(crate) fn find_by_key(dir: &Path, key: &PublicKey) -> Result<Option<Identity>, AuthError> {
    for path in identity_files(dir)? {
        let identity = match Identity::load(&path, None) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable remote identity");
                continue;
            }
        };
        if identity.public_key() == key {
            return Ok(Some(identity));
        }
    }
    Ok(None)
}

fn identity_files(dir: &Path) -> Result<Vec<PathBuf>, AuthError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
