// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use assemblage_core::{AssemblyDescriptor, ClientKind, ClientRecord};
use assemblage_net::RoutingId;

/// A live connection bound to a persisted client.
///
/// Lives only as long as its routing id is connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    pub routing_id: RoutingId,
    pub record: ClientRecord,
    /// Assembly dispatched to this worker and not yet reported
    pub assigned: Option<AssemblyDescriptor>,
}

impl ClientSession {
    pub fn new(routing_id: RoutingId, record: ClientRecord) -> Self {
        Self { routing_id, record, assigned: None }
    }

    pub fn name(&self) -> &str {
        self.record.name.as_str()
    }

    pub fn kind(&self) -> ClientKind {
        self.record.kind
    }

    pub fn is_idle_worker(&self) -> bool {
        self.kind() == ClientKind::Worker && self.assigned.is_none()
    }
}
