// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listening socket for the server.
//!
//! Each accepted connection gets a [`RoutingId`] that is never reused. The
//! handshake runs in its own task; once it succeeds the peer is addressable
//! by that id until it disconnects or is closed.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::channel::{server_handshake, Authenticator, HandshakeError, Identity, Session};
use crate::endpoint::Endpoint;
use crate::link::{join_writers, Link, LinkEvent};
use crate::queue::OutboundFrame;
use crate::socket::{Heartbeat, Readiness, Socket, TransportError};

pub(crate) const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport-assigned identifier of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutingId(u64);

impl RoutingId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoutingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub identity: Arc<Identity>,
    pub authenticator: Arc<Authenticator>,
    pub heartbeat: Heartbeat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    Accepted { addr: SocketAddr },
    HandshakeSucceeded { routing_id: RoutingId, client_name: String },
    HandshakeFailed { addr: SocketAddr, reason: String },
    Message { routing_id: RoutingId, client_name: String, bytes: Vec<u8> },
    Disconnected { routing_id: RoutingId, client_name: String, reason: String },
}

struct Peer {
    name: String,
    link: Link,
}

struct HandshakeOutcome {
    routing_id: RoutingId,
    addr: SocketAddr,
    result: Result<(TcpStream, Session), HandshakeError>,
}

enum Wake {
    Accepted(std::io::Result<(TcpStream, SocketAddr)>),
    Handshake(HandshakeOutcome),
    Link(RoutingId, LinkEvent),
}

pub struct RouterSocket {
    listener: TcpListener,
    endpoint: Endpoint,
    options: RouterOptions,
    next_id: u64,
    peers: HashMap<RoutingId, Peer>,
    handshake_tx: mpsc::UnboundedSender<HandshakeOutcome>,
    handshakes: mpsc::UnboundedReceiver<HandshakeOutcome>,
    link_tx: mpsc::UnboundedSender<(RoutingId, LinkEvent)>,
    link_events: mpsc::UnboundedReceiver<(RoutingId, LinkEvent)>,
    /// Writers of closed peers still flushing their last frames
    closing: Vec<JoinHandle<()>>,
}

impl RouterSocket {
    pub async fn bind(endpoint: &Endpoint, options: RouterOptions) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(endpoint.address()).await?;
        let endpoint = Endpoint::from(listener.local_addr()?);
        debug!(%endpoint, "router bound");
        let (handshake_tx, handshakes) = mpsc::unbounded_channel();
        let (link_tx, link_events) = mpsc::unbounded_channel();
        Ok(Self {
            listener,
            endpoint,
            options,
            next_id: 1,
            peers: HashMap::new(),
            handshake_tx,
            handshakes,
            link_tx,
            link_events,
            closing: Vec::new(),
        })
    }

    /// The bound endpoint, with the actual port when bound to port 0.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn peer_name(&self, routing_id: RoutingId) -> Option<&str> {
        self.peers.get(&routing_id).map(|p| p.name.as_str())
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Close a peer's connection after its queued messages are written.
    pub fn close_peer(&mut self, routing_id: RoutingId) -> bool {
        let Some(peer) = self.peers.remove(&routing_id) else {
            return false;
        };
        debug!(%routing_id, "peer closed");
        self.closing.retain(|writer| !writer.is_finished());
        self.closing.extend(peer.link.close());
        true
    }

    fn start_handshake(&mut self, stream: TcpStream, addr: SocketAddr) {
        let routing_id = RoutingId(self.next_id);
        self.next_id += 1;
        let identity = Arc::clone(&self.options.identity);
        let authenticator = Arc::clone(&self.options.authenticator);
        let tx = self.handshake_tx.clone();
        tokio::spawn(async move {
            let result = accept_peer(stream, &identity, &authenticator).await;
            let _ = tx.send(HandshakeOutcome { routing_id, addr, result });
        });
    }

    fn handle(&mut self, wake: Wake) -> Option<RouterEvent> {
        match wake {
            Wake::Accepted(Ok((stream, addr))) => {
                self.start_handshake(stream, addr);
                Some(RouterEvent::Accepted { addr })
            }
            Wake::Accepted(Err(e)) => {
                warn!(error = %e, "accept failed");
                None
            }
            Wake::Handshake(HandshakeOutcome { routing_id, addr, result }) => match result {
                Ok((stream, session)) => {
                    let client_name = session.peer_name.clone();
                    let link = Link::spawn(
                        stream,
                        session,
                        self.options.heartbeat,
                        routing_id,
                        self.link_tx.clone(),
                    );
                    self.peers.insert(routing_id, Peer { name: client_name.clone(), link });
                    Some(RouterEvent::HandshakeSucceeded { routing_id, client_name })
                }
                Err(e) => Some(RouterEvent::HandshakeFailed { addr, reason: e.to_string() }),
            },
            Wake::Link(routing_id, LinkEvent::Message(bytes)) => {
                let peer = self.peers.get(&routing_id)?;
                Some(RouterEvent::Message { routing_id, client_name: peer.name.clone(), bytes })
            }
            Wake::Link(routing_id, LinkEvent::Closed(reason)) => {
                let peer = self.peers.remove(&routing_id)?;
                Some(RouterEvent::Disconnected { routing_id, client_name: peer.name, reason })
            }
        }
    }
}

async fn accept_peer(
    mut stream: TcpStream,
    identity: &Identity,
    authenticator: &Authenticator,
) -> Result<(TcpStream, Session), HandshakeError> {
    stream.set_nodelay(true)?;
    let session =
        tokio::time::timeout(HANDSHAKE_TIMEOUT, server_handshake(&mut stream, identity, authenticator))
            .await
            .map_err(|_| HandshakeError::Timeout)??;
    Ok((stream, session))
}

async fn peer_writable(peers: &HashMap<RoutingId, Peer>, to: Option<&RoutingId>) {
    if let Some(peer) = to.and_then(|id| peers.get(id)) {
        // An error means the link is gone; try_send reports that
        let _ = peer.link.tx.reserve().await;
    }
}

#[async_trait]
impl Socket for RouterSocket {
    type Address = RoutingId;
    type Event = RouterEvent;

    async fn ready(&mut self, write_to: Option<&RoutingId>) -> Readiness<RouterEvent> {
        loop {
            let wake = tokio::select! {
                accepted = self.listener.accept() => Wake::Accepted(accepted),
                Some(outcome) = self.handshakes.recv() => Wake::Handshake(outcome),
                Some((id, event)) = self.link_events.recv() => Wake::Link(id, event),
                () = peer_writable(&self.peers, write_to), if write_to.is_some() => {
                    return Readiness::Writable;
                }
            };
            if let Some(event) = self.handle(wake) {
                return Readiness::Event(event);
            }
        }
    }

    fn try_send(&mut self, frame: &OutboundFrame<RoutingId>) -> Result<(), TransportError> {
        let peer = self
            .peers
            .get(&frame.to)
            .ok_or_else(|| TransportError::UnknownPeer(frame.to.to_string()))?;
        match peer.link.tx.try_send(frame.bytes.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(TransportError::WouldBlock),
            Err(TrySendError::Closed(_)) => return Err(TransportError::Closed),
        }
        if frame.close_after {
            self.close_peer(frame.to);
        }
        Ok(())
    }

    async fn shutdown(&mut self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut ids: Vec<RoutingId> = self.peers.keys().copied().collect();
        ids.sort();
        for routing_id in ids {
            self.close_peer(routing_id);
        }
        join_writers(&mut self.closing, deadline).await;
    }
}
