// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection lifecycle callbacks shared by the server and the worker.

use std::fmt;
use std::net::SocketAddr;

use tracing::debug;

use crate::endpoint::Endpoint;
use crate::router::RoutingId;

/// The far end of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// Set on the accepting side only
    pub routing_id: Option<RoutingId>,
    pub name: String,
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.routing_id {
            Some(id) => write!(f, "{} ({id})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Transport events worth reacting to. Every callback logs by default.
pub trait ConnectionObserver {
    fn on_accepted(&mut self, addr: SocketAddr) {
        debug!(%addr, "connection accepted");
    }

    fn on_connected(&mut self, endpoint: &Endpoint) {
        debug!(%endpoint, "connected");
    }

    fn on_handshake_succeeded(&mut self, peer: &PeerInfo) {
        debug!(%peer, "handshake succeeded");
    }

    fn on_handshake_failed(&mut self, peer: &str, reason: &str) {
        debug!(peer, reason, "handshake failed");
    }

    fn on_disconnected(&mut self, peer: &PeerInfo, reason: &str) {
        debug!(%peer, reason, "disconnected");
    }
}
