// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status and greeting payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of a successful `status` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub server_version: String,
    pub protocol_version: u64,
    /// Whole seconds since the server started
    pub uptime: u64,
    pub state: String,
}

/// Payload of a worker's `status_report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub version: String,
    pub state: String,
    pub uptime: u64,
}

/// Decoded `hello` payload: `[kind, version, timestamp]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub kind: String,
    pub version: String,
    pub timestamp: u64,
}

impl Greeting {
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let items = payload.as_array()?;
        match items.as_slice() {
            [kind, version, timestamp] => Some(Greeting {
                kind: kind.as_str()?.to_string(),
                version: version.as_str()?.to_string(),
                timestamp: timestamp.as_u64()?,
            }),
            _ => None,
        }
    }
}
