// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The socket seam between the reactor and a transport.

use std::fmt;
use std::time::Duration;

use assemblage_core::ValidationError;
use assemblage_wire::ProtocolError;
use async_trait::async_trait;
use thiserror::Error;

use crate::channel::HandshakeError;
use crate::queue::OutboundFrame;

/// Errors from sending on or driving a socket.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer cannot take more data right now; retry once writable
    #[error("send would block")]
    WouldBlock,

    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    #[error("connection closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Endpoint(#[from] ValidationError),
}

/// What a socket has to report when the reactor polls it.
#[derive(Debug)]
pub enum Readiness<E> {
    /// Something arrived: a message, a new peer, a lost peer
    Event(E),
    /// The peer at the head of the output queue can accept a frame
    Writable,
}

/// A transport the reactor can multiplex.
///
/// `ready` must be cancel-safe: the reactor drops it whenever a timer or a
/// signal fires first.
#[async_trait]
pub trait Socket: Send {
    type Address: Clone + fmt::Debug + Send + Sync;
    type Event: Send;

    /// Wait for the next event, or for `write_to` to become writable.
    ///
    /// With `write_to == None` the socket never reports `Writable`.
    async fn ready(&mut self, write_to: Option<&Self::Address>) -> Readiness<Self::Event>;

    /// Hand one frame to the transport without waiting.
    fn try_send(&mut self, frame: &OutboundFrame<Self::Address>) -> Result<(), TransportError>;

    /// Close every connection, waiting up to `timeout` for frames already
    /// handed over by `try_send` to reach the wire.
    ///
    /// Must run on the runtime that owns the connections, before it is dropped.
    async fn shutdown(&mut self, timeout: Duration) {
        let _ = timeout;
    }
}

/// A socket holding one outbound connection.
pub trait Connector: Socket {
    /// Drop the connection and dial again after the reconnect interval.
    fn reconnect(&mut self);

    /// Drop the connection for good.
    fn close(&mut self);
}

/// Transport liveness settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// How often a ping is sent on an idle link
    pub interval: Duration,
    /// Silence after which the peer is considered gone
    pub timeout: Duration,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self { interval: Duration::from_secs(5), timeout: Duration::from_secs(15) }
    }
}
