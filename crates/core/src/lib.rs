// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! assemblage-core: records and collaborator interfaces shared by the
//! Assemblage server, worker and storage crates.

pub mod assembly;
pub mod builder;
pub mod client;
pub mod metastore;
pub mod name;

pub use assembly::{AssemblyDescriptor, AssemblyId, AssemblyRequest, AssemblyResult, BuildOutcome};
pub use builder::{AssemblyBuilder, BuildStep, BuilderFactory, StepBuilder, StepBuilderFactory};
pub use client::{ClientId, ClientKind, ClientRecord};
pub use metastore::{Metastore, StoreError};
pub use name::{is_valid_name, ClientName, ValidationError, NAME_MAX_LENGTH, NAME_MIN_LENGTH};

/// Package version, reported in `hello` and status messages.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
