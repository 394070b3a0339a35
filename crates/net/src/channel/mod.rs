// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secure channel: local and remote identities, peer authorization, and the
//! encrypted link handshake.
//!
//! Certificate store layout:
//!
//! ```text
//! <cert_store_dir>/
//!   local.toml              this process's name and public key
//!   local.key               its secret key (mode 0600)
//!   remotes/<name>.toml     trusted peers
//! ```

mod auth;
mod cipher;
mod handshake;
mod identity;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assemblage_core::{ClientName, ValidationError};
use assemblage_wire::ProtocolError;
use parking_lot::Mutex;
use rand_core::{OsRng, RngCore};
use thiserror::Error;
use tracing::{info, warn};
use x25519_dalek::PublicKey;

pub use auth::Authenticator;
pub(crate) use cipher::{open_frame, seal_frame, CipherState, FrameKind};
pub(crate) use handshake::{client_handshake, server_handshake, Session};
pub use identity::{parse_public_key, Identity};

/// Domain string every handshake is bound to
pub const AUTH_DOMAIN: &str = "assemblage";

const LOCAL_PUBLIC: &str = "local.toml";
const LOCAL_SECRET: &str = "local.key";
const REMOTES_DIR: &str = "remotes";

/// Identity and authorization misconfiguration.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no certificate store configured")]
    NoCertStore,

    #[error("identity already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("no local identity in {}", .0.display())]
    MissingLocalIdentity(PathBuf),

    #[error("identity {0:?} has no secret key")]
    NoSecret(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("malformed identity file {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("peer key not authorized: {0}")]
    Rejected(String),

    #[error("secure transport unavailable: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while establishing an encrypted link.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("peer rejected the connection: {0}")]
    Rejected(String),

    #[error("malformed handshake frame")]
    BadFrame,

    #[error("decryption failed")]
    Crypto,

    #[error("peer sent a low-order key")]
    WeakKey,

    #[error("nonce space exhausted")]
    NonceExhausted,

    #[error("local identity has no secret key")]
    NoSecret,

    #[error("handshake timed out")]
    Timeout,
}

/// Settings for a [`SecureChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Absent means an ephemeral identity and an allow-any authenticator
    pub cert_store_dir: Option<PathBuf>,
    pub local_name: String,
}

/// Identity store and authenticator owned by one server or worker.
///
/// Lookups of the local identity and the authenticator are memoized until
/// [`SecureChannel::reset`].
#[derive(Debug)]
pub struct SecureChannel {
    config: AuthConfig,
    local: Mutex<Option<Arc<Identity>>>,
    authenticator: Mutex<Option<Arc<Authenticator>>>,
}

impl SecureChannel {
    pub fn new(config: AuthConfig) -> Self {
        Self { config, local: Mutex::new(None), authenticator: Mutex::new(None) }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    fn store(&self) -> Result<&Path, AuthError> {
        self.config.cert_store_dir.as_deref().ok_or(AuthError::NoCertStore)
    }

    fn remotes_dir(&self) -> Result<PathBuf, AuthError> {
        Ok(self.store()?.join(REMOTES_DIR))
    }

    fn remote_path(&self, name: &str) -> Result<PathBuf, AuthError> {
        let name = ClientName::new(name)?;
        Ok(self.remotes_dir()?.join(format!("{name}.toml")))
    }

    /// The persisted local identity, or an ephemeral one without a store.
    pub fn local_identity(&self) -> Result<Arc<Identity>, AuthError> {
        let mut local = self.local.lock();
        if let Some(identity) = local.as_ref() {
            return Ok(Arc::clone(identity));
        }
        let identity = match &self.config.cert_store_dir {
            None => {
                warn!(name = %self.config.local_name, "no certificate store configured, using an ephemeral identity");
                Identity::generate(self.config.local_name.clone())
            }
            Some(dir) => {
                let public = dir.join(LOCAL_PUBLIC);
                if !public.exists() {
                    return Err(AuthError::MissingLocalIdentity(dir.clone()));
                }
                Identity::load(&public, Some(&dir.join(LOCAL_SECRET)))?
            }
        };
        let identity = Arc::new(identity);
        *local = Some(Arc::clone(&identity));
        Ok(identity)
    }

    /// Create and persist the local keypair. Never overwrites.
    pub fn generate_local_identity(&self) -> Result<Arc<Identity>, AuthError> {
        let dir = self.store()?;
        let public = dir.join(LOCAL_PUBLIC);
        if public.exists() {
            return Err(AuthError::AlreadyExists(public));
        }
        std::fs::create_dir_all(dir)?;

        let identity = Identity::generate(self.config.local_name.clone());
        identity.save_public(&public)?;
        if let Err(e) = identity.save_secret(&dir.join(LOCAL_SECRET)) {
            if let Err(remove) = std::fs::remove_file(&public) {
                warn!(path = %public.display(), error = %remove, "failed to remove public identity");
            }
            return Err(e);
        }
        info!(name = identity.name(), dir = %dir.display(), "generated local identity");

        let identity = Arc::new(identity);
        *self.local.lock() = Some(Arc::clone(&identity));
        Ok(identity)
    }

    pub fn remote_identity(&self, name: &str) -> Result<Option<Identity>, AuthError> {
        let path = self.remote_path(name)?;
        if !path.exists() {
            return Ok(None);
        }
        Identity::load(&path, None).map(Some)
    }

    pub fn remote_identity_by_key(&self, key: &PublicKey) -> Result<Option<Identity>, AuthError> {
        identity::find_by_key(&self.remotes_dir()?, key)
    }

    /// Trust `public_key` under `name`. Fails if `name` is already trusted.
    pub fn save_remote_identity(&self, name: &str, public_key: PublicKey) -> Result<Identity, AuthError> {
        let path = self.remote_path(name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let identity = Identity::from_public(name, public_key);
        identity.save_public(&path)?;
        info!(name, "saved remote identity");
        Ok(identity)
    }

    /// Returns false if no such identity was stored.
    pub fn remove_remote_identity(&self, name: &str) -> Result<bool, AuthError> {
        let path = self.remote_path(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(name, "removed remote identity");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// The authenticator for accepted connections.
    pub fn authenticator(&self) -> Result<Arc<Authenticator>, AuthError> {
        let mut slot = self.authenticator.lock();
        if let Some(authenticator) = slot.as_ref() {
            return Ok(Arc::clone(authenticator));
        }
        let authenticator = match &self.config.cert_store_dir {
            Some(_) => Authenticator::AllowList { remotes_dir: self.remotes_dir()? },
            None => {
                warn!("no certificate store configured, accepting any peer key");
                Authenticator::AllowAny
            }
        };
        let authenticator = Arc::new(authenticator);
        *slot = Some(Arc::clone(&authenticator));
        Ok(authenticator)
    }

    /// Verify randomness and the AEAD are usable before opening sockets.
    pub fn check_environment(&self) -> Result<(), AuthError> {
        let mut key = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut key)
            .map_err(|e| AuthError::Unsupported(format!("OS random source: {e}")))?;

        let mut sealer = CipherState::new(key);
        let mut opener = CipherState::new(key);
        let sealed = sealer
            .seal(AUTH_DOMAIN.as_bytes())
            .map_err(|e| AuthError::Unsupported(format!("AEAD seal: {e}")))?;
        let opened = opener
            .open(&sealed)
            .map_err(|e| AuthError::Unsupported(format!("AEAD open: {e}")))?;
        if opened != AUTH_DOMAIN.as_bytes() {
            return Err(AuthError::Unsupported("AEAD self-test mismatch".to_string()));
        }
        Ok(())
    }

    /// Drop memoized identity and authenticator.
    pub fn reset(&self) {
        *self.local.lock() = None;
        *self.authenticator.lock() = None;
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
