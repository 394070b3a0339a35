//! End-to-end scenarios: a real server and worker over loopback, each on its
//! own thread with its own run directory.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/server/mod.rs"]
mod server;

#[path = "specs/worker/mod.rs"]
mod worker;
