// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `assemblage` - set up and run Assemblage servers and workers

mod commands;

use clap::{Parser, Subcommand};

use commands::{add, create, key, start};

#[derive(Parser)]
#[command(
    name = "assemblage",
    version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    about = "Build coordination server and workers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a run directory with a new identity
    Create(create::CreateArgs),
    /// Trust a peer's public key
    Add(add::AddArgs),
    /// Print the local public key
    Key(key::KeyArgs),
    /// Run a server or worker in the foreground
    Start(start::StartArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Create(args) => create::create(args),
        Commands::Add(args) => add::add(args),
        Commands::Key(args) => key::key(args),
        Commands::Start(args) => start::start(args),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
