// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-directory configuration (`assemblage.toml`).
//!
//! Every field has a default, so a partial file is valid. Relative paths are
//! resolved against the run directory on load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use assemblage_core::ValidationError;
use assemblage_net::{AuthConfig, Endpoint, Heartbeat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env::CONFIG_FILE;

/// Default name of the server's identity
pub const DEFAULT_SERVER_NAME: &str = "assemblage-server";

const DEFAULT_WORKER_NAME: &str = "assemblage-worker";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Which process a run directory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Worker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Server => "server",
            Role::Worker => "worker",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthSection,
    pub server: ServerConfig,
    pub worker: WorkerConfig,
    pub db: DbConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_store_dir: Option<PathBuf>,
    /// Overrides the role's default identity name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub endpoint: String,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: "tcp://127.0.0.1:0".to_string(),
            heartbeat_interval_ms: 5_000,
            heartbeat_timeout_ms: 15_000,
        }
    }
}

impl ServerConfig {
    pub fn endpoint(&self) -> Result<Endpoint, ValidationError> {
        self.endpoint.parse()
    }

    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat {
            interval: Duration::from_millis(self.heartbeat_interval_ms),
            timeout: Duration::from_millis(self.heartbeat_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub name: String,
    /// Server URL; empty until `add server`
    pub server: String,
    /// Name of the server's remote identity
    pub server_name: String,
    pub tags: Vec<String>,
    pub status_interval_ms: u64,
    pub build_tick_ms: u64,
    pub reconnect_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_WORKER_NAME.to_string(),
            server: String::new(),
            server_name: DEFAULT_SERVER_NAME.to_string(),
            tags: Vec::new(),
            status_interval_ms: 5_000,
            build_tick_ms: 100,
            reconnect_interval_ms: 1_000,
            heartbeat_interval_ms: 5_000,
            heartbeat_timeout_ms: 15_000,
        }
    }
}

impl WorkerConfig {
    pub fn server_endpoint(&self) -> Result<Endpoint, ValidationError> {
        self.server.parse()
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn build_tick(&self) -> Duration {
        Duration::from_millis(self.build_tick_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat {
            interval: Duration::from_millis(self.heartbeat_interval_ms),
            timeout: Duration::from_millis(self.heartbeat_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Absent means an in-memory metastore
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Initial configuration written by `create server|worker`.
    pub fn for_role(role: Role) -> Self {
        let mut config = Config {
            auth: AuthSection { cert_store_dir: Some(PathBuf::from("certs")), local_name: None },
            ..Config::default()
        };
        if role == Role::Server {
            config.db.path = Some(PathBuf::from("db.json"));
        }
        config
    }

    /// Settings for this role's [`assemblage_net::SecureChannel`].
    pub fn auth_config(&self, role: Role) -> AuthConfig {
        let local_name = self.auth.local_name.clone().unwrap_or_else(|| match role {
            Role::Server => DEFAULT_SERVER_NAME.to_string(),
            Role::Worker => self.worker.name.clone(),
        });
        AuthConfig { cert_store_dir: self.auth.cert_store_dir.clone(), local_name }
    }

    /// Read `assemblage.toml` from `dir`; a missing file gives the defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(dir)?;
        config.resolve_paths(dir);
        Ok(config)
    }

    /// Apply `change` to the file in `dir` and return the updated, resolved config.
    ///
    /// Paths are written back as they were found.
    pub fn update(dir: &Path, change: impl FnOnce(&mut Config)) -> Result<Self, ConfigError> {
        let mut config = Self::read(dir)?;
        change(&mut config);
        config.save(dir)?;
        config.resolve_paths(dir);
        Ok(config)
    }

    fn read(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Write `assemblage.toml` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        let path = dir.join(CONFIG_FILE);
        let text = toml::to_string_pretty(self)?;
        std::fs::write(&path, text).map_err(|source| ConfigError::Io { path, source })
    }

    fn resolve_paths(&mut self, dir: &Path) {
        for path in [&mut self.auth.cert_store_dir, &mut self.db.path].into_iter().flatten() {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
