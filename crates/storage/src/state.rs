// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory metastore contents.

use std::collections::BTreeMap;

use assemblage_core::{
    AssemblyDescriptor, AssemblyId, AssemblyRequest, AssemblyResult, ClientId, ClientKind,
    ClientName, ClientRecord, StoreError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredClient {
    pub record: ClientRecord,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAssembly {
    pub descriptor: AssemblyDescriptor,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub result: Option<AssemblyResult>,
    /// Worker that reported the result
    #[serde(default)]
    pub built_by: Option<ClientId>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Everything the metastore persists.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaState {
    /// Clients by name
    #[serde(default)]
    pub clients: BTreeMap<String, StoredClient>,
    #[serde(default)]
    pub assemblies: BTreeMap<AssemblyId, StoredAssembly>,
    #[serde(default)]
    pub last_client_id: u64,
    #[serde(default)]
    pub last_assembly_id: u64,
}

impl MetaState {
    pub fn create_client(
        &mut self,
        name: &ClientName,
        kind: ClientKind,
        tags: &[String],
    ) -> Result<ClientId, StoreError> {
        if self.clients.contains_key(name.as_str()) {
            return Err(StoreError::DuplicateClient(name.to_string()));
        }
        self.last_client_id += 1;
        let id = ClientId(self.last_client_id);
        let record = ClientRecord { id, name: name.clone(), kind, tags: tags.to_vec() };
        self.clients
            .insert(name.to_string(), StoredClient { record, created_at: Utc::now() });
        Ok(id)
    }

    pub fn find_client(&self, name: &str) -> Option<&ClientRecord> {
        self.clients.get(name).map(|c| &c.record)
    }

    pub fn create_assembly(&mut self, request: AssemblyRequest) -> AssemblyDescriptor {
        self.last_assembly_id += 1;
        let descriptor = AssemblyDescriptor::new(AssemblyId(self.last_assembly_id), request);
        self.assemblies.insert(
            descriptor.id,
            StoredAssembly {
                descriptor: descriptor.clone(),
                created_at: Utc::now(),
                result: None,
                built_by: None,
                finished_at: None,
            },
        );
        descriptor
    }

    /// Record (or replace) the result of an assembly.
    pub fn record_assembly_result(
        &mut self,
        client: ClientId,
        result: &AssemblyResult,
    ) -> Result<(), StoreError> {
        let assembly = self
            .assemblies
            .get_mut(&result.assembly_id)
            .ok_or(StoreError::UnknownAssembly(result.assembly_id))?;
        assembly.result = Some(result.clone());
        assembly.built_by = Some(client);
        assembly.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn assembly(&self, id: AssemblyId) -> Option<&StoredAssembly> {
        self.assemblies.get(&id)
    }
}
