// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assemblage server and worker processes.
//!
//! Both run a single-threaded reactor over one authenticated socket: the
//! server answers clients and dispatches assemblies, the worker builds them.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod bootstrap;
pub mod config;
pub mod env;
pub mod logging;
pub mod server;
pub mod worker;

pub use bootstrap::BootstrapError;
pub use config::{Config, ConfigError, Role};
pub use logging::init_logging;
pub use server::{ClientSession, CommandError, Server, ServerError, ServerHandle};
pub use worker::{ConnectionState, Worker, WorkerError, WorkerHandle};
