// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod add;
pub mod create;
pub mod key;
pub mod start;

use std::path::PathBuf;

use assemblage_daemon::{env, Role};
use clap::ValueEnum;

/// Which process a run directory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Server,
    Worker,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Server => Role::Server,
            RoleArg::Worker => Role::Worker,
        }
    }
}

/// The given run directory, else `ASSEMBLAGE_DIR`, else the current directory.
pub fn run_dir(dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(env::run_dir)
}
