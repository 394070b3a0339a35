// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! assemblage-storage: the metastore backing the server.
//!
//! State lives in memory and, when a path is given, is rewritten to a JSON
//! file after every mutation.

mod state;
mod store;

pub use state::{MetaState, StoredAssembly, StoredClient};
pub use store::Store;
