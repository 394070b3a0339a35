// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `assemblage start` - run in the foreground until signalled

use std::path::PathBuf;

use anyhow::Result;
use assemblage_daemon::{bootstrap, env, init_logging};
use clap::Args;
use tracing::error;

use super::{run_dir, RoleArg};

#[derive(Args)]
pub struct StartArgs {
    pub role: RoleArg,
    pub dir: Option<PathBuf>,
}

pub fn start(args: StartArgs) -> Result<()> {
    let dir = run_dir(args.dir);
    let _guard = init_logging(env::log_file().as_deref());

    let result = match args.role {
        RoleArg::Server => bootstrap::open_server(&dir)?.start().map_err(anyhow::Error::from),
        RoleArg::Worker => bootstrap::open_worker(&dir)?.run().map_err(anyhow::Error::from),
    };
    if let Err(e) = &result {
        error!(error = %e, "exited with error");
    }
    result
}
