// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `assemblage create` - new run directories

use std::path::PathBuf;

use anyhow::Result;
use assemblage_daemon::{bootstrap, Role};
use clap::Args;

use super::{run_dir, RoleArg};

#[derive(Args)]
pub struct CreateArgs {
    pub role: RoleArg,
    /// Run directory; must not exist or be empty
    pub dir: Option<PathBuf>,
}

pub fn create(args: CreateArgs) -> Result<()> {
    let dir = run_dir(args.dir);
    let role = Role::from(args.role);

    bootstrap::setup_run_directory(&dir, role)?;
    let key = bootstrap::generate_cert(&dir, role)?;
    if role == Role::Server {
        bootstrap::create_database(&dir)?;
    }

    println!("Created {} in {}", role.as_str(), dir.display());
    println!("Public key: {key}");
    Ok(())
}
