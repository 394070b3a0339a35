// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Name of the configuration file inside a run directory
pub const CONFIG_FILE: &str = "assemblage.toml";

/// Run directory used when none is given: `ASSEMBLAGE_DIR` > current directory
pub fn run_dir() -> PathBuf {
    match std::env::var("ASSEMBLAGE_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from("."),
    }
}

/// Log filter directives (default `info`)
pub fn log_filter() -> String {
    std::env::var("ASSEMBLAGE_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".to_string())
}

/// Optional log file; stderr when unset
pub fn log_file() -> Option<PathBuf> {
    std::env::var("ASSEMBLAGE_LOG_FILE").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// How long shutdown waits for queued messages (default 2s, `ASSEMBLAGE_DRAIN_TIMEOUT_MS`).
pub fn drain_timeout() -> Duration {
    std::env::var("ASSEMBLAGE_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(2))
}
