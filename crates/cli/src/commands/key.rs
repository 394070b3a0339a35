// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `assemblage key` - print the local public key

use std::path::PathBuf;

use anyhow::Result;
use assemblage_daemon::bootstrap;
use clap::Args;

use super::{run_dir, RoleArg};

#[derive(Args)]
pub struct KeyArgs {
    pub role: RoleArg,
    pub dir: Option<PathBuf>,
}

pub fn key(args: KeyArgs) -> Result<()> {
    println!("{}", bootstrap::public_key(&run_dir(args.dir), args.role.into())?);
    Ok(())
}
