// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `assemblage add` - trust peers

use std::path::PathBuf;

use anyhow::Result;
use assemblage_daemon::bootstrap;
use clap::{Args, Subcommand};

use super::run_dir;

#[derive(Args)]
pub struct AddArgs {
    #[command(subcommand)]
    pub command: AddCommand,
}

#[derive(Subcommand)]
pub enum AddCommand {
    /// Register a worker with this server
    Worker {
        name: String,
        /// Hex public key printed by `create worker`
        key: String,
        dir: Option<PathBuf>,
        /// Tags the worker provides, comma separated
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Register a repository allowed to push to this server
    Repository {
        name: String,
        key: String,
        dir: Option<PathBuf>,
    },
    /// Point this worker at a server
    Server {
        /// Server endpoint, e.g. tcp://build.example.com:7700
        url: String,
        /// Hex public key printed by `create server`
        key: String,
        dir: Option<PathBuf>,
    },
}

pub fn add(args: AddArgs) -> Result<()> {
    match args.command {
        AddCommand::Worker { name, key, dir, tags } => {
            let id = bootstrap::add_worker(&run_dir(dir), &name, &key, &tags)?;
            println!("Added worker {name} (client {id})");
        }
        AddCommand::Repository { name, key, dir } => {
            let id = bootstrap::add_repository(&run_dir(dir), &name, &key)?;
            println!("Added repository {name} (client {id})");
        }
        AddCommand::Server { url, key, dir } => {
            bootstrap::add_server(&run_dir(dir), &url, &key)?;
            println!("Added server {url}");
        }
    }
    Ok(())
}
