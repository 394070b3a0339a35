// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assemblies: units of build work tying a repository revision to the tags a
//! worker must provide to build it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Metastore identifier for an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssemblyId(pub u64);

impl fmt::Display for AssemblyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A repository event asking for something to be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyRequest {
    pub repository: String,
    pub revision: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// What a worker receives in a `new_assembly` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyDescriptor {
    pub id: AssemblyId,
    pub repository: String,
    pub revision: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AssemblyDescriptor {
    pub fn new(id: AssemblyId, request: AssemblyRequest) -> Self {
        Self { id, repository: request.repository, revision: request.revision, tags: request.tags }
    }
}

/// How a build ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildOutcome {
    Succeeded,
    Failed,
}

/// The result a worker reports for one assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyResult {
    pub assembly_id: AssemblyId,
    pub outcome: BuildOutcome,
    #[serde(default)]
    pub message: String,
}

impl AssemblyResult {
    pub fn succeeded(assembly_id: AssemblyId, message: impl Into<String>) -> Self {
        Self { assembly_id, outcome: BuildOutcome::Succeeded, message: message.into() }
    }

    pub fn failed(assembly_id: AssemblyId, message: impl Into<String>) -> Self {
        Self { assembly_id, outcome: BuildOutcome::Failed, message: message.into() }
    }
}
