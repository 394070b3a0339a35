// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent metadata store, as seen by the server.

use thiserror::Error;

use crate::assembly::{AssemblyDescriptor, AssemblyId, AssemblyRequest, AssemblyResult};
use crate::client::{ClientId, ClientKind, ClientRecord};
use crate::name::ClientName;

/// Metastore failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("client {0} already exists")]
    DuplicateClient(String),

    #[error("no such assembly {0}")]
    UnknownAssembly(AssemblyId),

    #[error("database already exists at {0}")]
    AlreadyExists(String),
}

/// Clients, assemblies and build results.
pub trait Metastore: Send + Sync {
    fn create_client(
        &self,
        name: &ClientName,
        kind: ClientKind,
        tags: &[String],
    ) -> Result<ClientId, StoreError>;

    fn find_client(&self, name: &str) -> Result<Option<ClientRecord>, StoreError>;

    fn create_assembly(&self, request: AssemblyRequest) -> Result<AssemblyDescriptor, StoreError>;

    fn record_assembly_result(
        &self,
        client: ClientId,
        result: &AssemblyResult,
    ) -> Result<(), StoreError>;

    fn assembly(&self, id: AssemblyId) -> Result<Option<AssemblyDescriptor>, StoreError>;

    /// The recorded result for an assembly, if any.
    fn assembly_result(&self, id: AssemblyId) -> Result<Option<AssemblyResult>, StoreError>;
}
