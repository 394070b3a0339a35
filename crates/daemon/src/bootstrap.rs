// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-directory setup and identity/client registration.
//!
//! Every operation takes the run directory and reads its configuration, so
//! the CLI stays a thin argument parser.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assemblage_core::{ClientId, ClientKind, ClientName, Metastore, StoreError, ValidationError};
use assemblage_net::{parse_public_key, AuthError, Endpoint, SecureChannel};
use assemblage_storage::Store;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, ConfigError, Role};
use crate::server::Server;
use crate::worker::Worker;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("No database configured in {0}")]
    NoDatabase(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Create `dir` for `role` and write its initial configuration.
///
/// An existing directory is accepted only when empty.
pub fn setup_run_directory(dir: &Path, role: Role) -> Result<Config, BootstrapError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(BootstrapError::NotADirectory(dir.to_path_buf()));
        }
        if std::fs::read_dir(dir)?.next().is_some() {
            return Err(BootstrapError::DirectoryNotEmpty(dir.to_path_buf()));
        }
    }
    std::fs::create_dir_all(dir)?;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755))?;

    Config::for_role(role).save(dir)?;
    info!(dir = %dir.display(), role = role.as_str(), "run directory created");
    Ok(Config::load(dir)?)
}

fn channel(dir: &Path, role: Role) -> Result<SecureChannel, BootstrapError> {
    let config = Config::load(dir)?;
    Ok(SecureChannel::new(config.auth_config(role)))
}

/// Generate the local keypair; returns the hex public key.
pub fn generate_cert(dir: &Path, role: Role) -> Result<String, BootstrapError> {
    let identity = channel(dir, role)?.generate_local_identity()?;
    Ok(identity.public_key_hex())
}

/// The hex public key of the persisted local identity.
pub fn public_key(dir: &Path, role: Role) -> Result<String, BootstrapError> {
    let channel = channel(dir, role)?;
    if channel.config().cert_store_dir.is_none() {
        return Err(AuthError::NoCertStore.into());
    }
    Ok(channel.local_identity()?.public_key_hex())
}

/// Trust a worker's key and register it as a client; returns the client id.
pub fn add_worker(dir: &Path, name: &str, key: &str, tags: &[String]) -> Result<ClientId, BootstrapError> {
    add_client(dir, name, key, ClientKind::Worker, tags)
}

/// Trust a repository's key and register it as a client.
pub fn add_repository(dir: &Path, name: &str, key: &str) -> Result<ClientId, BootstrapError> {
    add_client(dir, name, key, ClientKind::Repository, &[])
}

fn add_client(
    dir: &Path,
    name: &str,
    key: &str,
    kind: ClientKind,
    tags: &[String],
) -> Result<ClientId, BootstrapError> {
    let name = ClientName::new(name)?;
    let key = parse_public_key(key)?;
    let config = Config::load(dir)?;
    let metastore = open_metastore(&config)?;
    if metastore.find_client(name.as_str())?.is_some() {
        return Err(StoreError::DuplicateClient(name.to_string()).into());
    }

    let channel = SecureChannel::new(config.auth_config(Role::Server));
    channel.save_remote_identity(name.as_str(), key)?;
    let id = match metastore.create_client(&name, kind, tags) {
        Ok(id) => id,
        Err(e) => {
            if let Err(remove) = channel.remove_remote_identity(name.as_str()) {
                warn!(client = %name, error = %remove, "failed to remove remote identity");
            }
            return Err(e.into());
        }
    };
    info!(client = %name, %kind, %id, "client added");
    Ok(id)
}

/// Trust the server's key and point the worker at `url`.
pub fn add_server(dir: &Path, url: &str, key: &str) -> Result<(), BootstrapError> {
    url.parse::<Endpoint>()?;
    let key = parse_public_key(key)?;
    let config = Config::load(dir)?;
    SecureChannel::new(config.auth_config(Role::Worker)).save_remote_identity(&config.worker.server_name, key)?;
    Config::update(dir, |c| c.worker.server = url.to_string())?;
    info!(server = url, "server added");
    Ok(())
}

/// Create the database file named in the configuration.
pub fn create_database(dir: &Path) -> Result<(), BootstrapError> {
    let config = Config::load(dir)?;
    let path = config.db.path.ok_or_else(|| BootstrapError::NoDatabase(dir.to_path_buf()))?;
    Store::create(path)?;
    Ok(())
}

/// The configured metastore, or an in-memory one when no path is set.
pub fn open_metastore(config: &Config) -> Result<Arc<dyn Metastore>, StoreError> {
    Ok(match &config.db.path {
        Some(path) => Arc::new(Store::open(path)?),
        None => Arc::new(Store::in_memory()),
    })
}

/// A server configured from `dir`, ready to start.
pub fn open_server(dir: &Path) -> Result<Server, BootstrapError> {
    let config = Config::load(dir)?;
    let channel = Arc::new(SecureChannel::new(config.auth_config(Role::Server)));
    let metastore = open_metastore(&config)?;
    Ok(Server::new(config.server, channel, metastore))
}

/// A worker configured from `dir`, ready to run.
pub fn open_worker(dir: &Path) -> Result<Worker, BootstrapError> {
    let config = Config::load(dir)?;
    let channel = Arc::new(SecureChannel::new(config.auth_config(Role::Worker)));
    Ok(Worker::new(config.worker, channel))
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
