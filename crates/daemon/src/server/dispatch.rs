// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server event handling: sessions, the output queue and assembly dispatch.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assemblage_core::{AssemblyDescriptor, Metastore, VERSION};
use assemblage_net::{
    ConnectionObserver, Event, Handler, OutboundFrame, OutputQueue, PeerInfo, Reactor, RouterEvent, RoutingId,
    Socket,
};
use assemblage_wire::{self as wire, ControlAction, Header, Notice};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::session::ClientSession;
use super::ServerError;

/// Message type of responses to undecodable frames
pub(crate) const ERROR_TYPE: &str = "error";

/// The server's side of the reactor loop.
pub(crate) struct Dispatcher<S: Socket> {
    pub(super) reactor: Reactor,
    pub(super) socket: S,
    pub(super) queue: OutputQueue<RoutingId>,
    pub(super) sessions: HashMap<RoutingId, ClientSession>,
    pub(super) metastore: Arc<dyn Metastore>,
    pub(super) start_time: Instant,
    /// Assemblies waiting for an idle worker, oldest first
    pub(super) pending: VecDeque<AssemblyDescriptor>,
    stopping: bool,
}

impl<S> Dispatcher<S>
where
    S: Socket<Address = RoutingId, Event = RouterEvent>,
{
    pub(crate) fn new(reactor: Reactor, socket: S, metastore: Arc<dyn Metastore>, start_time: Instant) -> Self {
        Self {
            reactor,
            socket,
            queue: OutputQueue::new(),
            sessions: HashMap::new(),
            metastore,
            start_time,
            pending: VecDeque::new(),
            stopping: false,
        }
    }

    pub(crate) fn session(&self, routing_id: RoutingId) -> Option<&ClientSession> {
        self.sessions.get(&routing_id)
    }

    /// Queue an encoded message for `routing_id`.
    pub(crate) fn send(&mut self, routing_id: RoutingId, bytes: Vec<u8>) {
        self.queue.enqueue(&mut self.reactor, OutboundFrame::new(routing_id, bytes));
    }

    pub(crate) fn respond(&mut self, routing_id: RoutingId, kind: &str, payload: &Value) {
        match wire::response(kind, true, payload) {
            Ok(bytes) => self.send(routing_id, bytes),
            Err(e) => error!(%routing_id, kind, error = %e, "failed to encode response"),
        }
    }

    pub(crate) fn respond_error(&mut self, routing_id: RoutingId, kind: &str, message: &str) {
        // An invalid type cannot be echoed back
        let kind = if wire::is_valid_type(kind) { kind } else { ERROR_TYPE };
        match wire::error_response(kind, message) {
            Ok(bytes) => self.send(routing_id, bytes),
            Err(e) => error!(%routing_id, kind, error = %e, "failed to encode error response"),
        }
    }

    /// Find or create the session for a message's origin.
    ///
    /// Returns false, after logging, when no persisted client has that name.
    fn ensure_session(&mut self, routing_id: RoutingId, client_name: &str) -> bool {
        if self.sessions.contains_key(&routing_id) {
            return true;
        }
        let record = match self.metastore.find_client(client_name) {
            Ok(Some(record)) => record,
            Ok(None) => {
                error!(%routing_id, client = client_name, "message from unknown client dropped");
                return false;
            }
            Err(e) => {
                error!(%routing_id, client = client_name, error = %e, "client lookup failed, message dropped");
                return false;
            }
        };
        info!(%routing_id, client = client_name, kind = %record.kind, "session created");
        self.sessions.insert(routing_id, ClientSession::new(routing_id, record));
        self.dispatch_pending();
        true
    }

    /// Drop a session; its unreported assembly goes back to the front of the pending list.
    pub(crate) fn remove_session(&mut self, routing_id: RoutingId) -> Option<ClientSession> {
        let mut session = self.sessions.remove(&routing_id)?;
        info!(%routing_id, client = session.name(), "session removed");
        if let Some(descriptor) = session.assigned.take() {
            info!(assembly = %descriptor.id, client = session.name(), "requeueing unfinished assembly");
            self.pending.push_front(descriptor);
            self.dispatch_pending();
        }
        Some(session)
    }

    /// Send `control: [disconnect]` and forget the session.
    pub(crate) fn disconnect_client(&mut self, routing_id: RoutingId) {
        match wire::control(ControlAction::Disconnect.as_str()) {
            Ok(bytes) => self.queue.enqueue(&mut self.reactor, OutboundFrame::closing(routing_id, bytes)),
            Err(e) => error!(%routing_id, error = %e, "failed to encode disconnect"),
        }
        self.remove_session(routing_id);
    }

    pub(crate) fn disconnect_all_clients(&mut self) {
        self.stopping = true;
        let mut ids: Vec<RoutingId> = self.sessions.keys().copied().collect();
        ids.sort();
        for routing_id in ids {
            self.disconnect_client(routing_id);
        }
    }

    /// Hand pending assemblies to idle workers that provide their tags.
    pub(crate) fn dispatch_pending(&mut self) {
        if self.stopping {
            return;
        }
        let mut held = VecDeque::new();
        while let Some(descriptor) = self.pending.pop_front() {
            match self.idle_worker_for(&descriptor) {
                Some(routing_id) => self.assign(routing_id, descriptor),
                None => held.push_back(descriptor),
            }
        }
        self.pending = held;
    }

    fn idle_worker_for(&self, descriptor: &AssemblyDescriptor) -> Option<RoutingId> {
        self.sessions
            .values()
            .filter(|s| s.is_idle_worker() && s.record.provides(&descriptor.tags))
            .map(|s| s.routing_id)
            .min()
    }

    fn assign(&mut self, routing_id: RoutingId, descriptor: AssemblyDescriptor) {
        let bytes = serde_json::to_value(&descriptor)
            .map_err(|e| e.to_string())
            .and_then(|payload| {
                wire::encode(Notice::NewAssembly.as_str(), &payload, Header::new()).map_err(|e| e.to_string())
            });
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(assembly = %descriptor.id, error = %e, "failed to encode assembly");
                return;
            }
        };
        let Some(session) = self.sessions.get_mut(&routing_id) else {
            return;
        };
        info!(assembly = %descriptor.id, worker = session.name(), "assembly dispatched");
        session.assigned = Some(descriptor);
        self.send(routing_id, bytes);
    }

    fn on_message(&mut self, routing_id: RoutingId, client_name: &str, bytes: &[u8]) {
        if !self.ensure_session(routing_id, client_name) {
            return;
        }
        let message = match wire::decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!(%routing_id, client = client_name, error = %e, "undecodable message");
                self.respond_error(routing_id, ERROR_TYPE, &e.to_string());
                return;
            }
        };
        if message.is_response() {
            debug!(%routing_id, kind = %message.kind, "ignoring response from client");
            return;
        }
        match self.run_command(routing_id, &message) {
            Ok(Some(payload)) => self.respond(routing_id, &message.kind, &payload),
            Ok(None) => {}
            Err(e) => {
                warn!(%routing_id, client = client_name, kind = %message.kind, error = %e, "command failed");
                self.respond_error(routing_id, &message.kind, &e.to_string());
            }
        }
    }

    fn on_router_event(&mut self, event: RouterEvent) {
        match event {
            RouterEvent::Accepted { addr } => self.on_accepted(addr),
            RouterEvent::HandshakeSucceeded { routing_id, client_name } => {
                self.on_handshake_succeeded(&PeerInfo { routing_id: Some(routing_id), name: client_name });
            }
            RouterEvent::HandshakeFailed { addr, reason } => self.on_handshake_failed(&addr.to_string(), &reason),
            RouterEvent::Message { routing_id, client_name, bytes } => {
                self.on_message(routing_id, &client_name, &bytes);
            }
            RouterEvent::Disconnected { routing_id, client_name, reason } => {
                self.on_disconnected(&PeerInfo { routing_id: Some(routing_id), name: client_name }, &reason);
            }
        }
    }

    /// Flush what is left after the loop stops.
    /// Flush queued frames, then close every connection once its frames are
    /// written. Both steps share `timeout`. Returns the frames left unsent.
    pub(crate) async fn drain(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let left = self.queue.drain(&mut self.reactor, &mut self.socket, timeout).await;
        self.socket.shutdown(deadline.saturating_duration_since(Instant::now())).await;
        left
    }
}

impl<S> ConnectionObserver for Dispatcher<S>
where
    S: Socket<Address = RoutingId, Event = RouterEvent>,
{
    fn on_accepted(&mut self, addr: SocketAddr) {
        debug!(%addr, "connection accepted");
    }

    fn on_handshake_succeeded(&mut self, peer: &PeerInfo) {
        info!(%peer, "client connected");
        let Some(routing_id) = peer.routing_id else {
            return;
        };
        match wire::hello("server", VERSION) {
            Ok(bytes) => self.send(routing_id, bytes),
            Err(e) => error!(%peer, error = %e, "failed to encode hello"),
        }
    }

    fn on_handshake_failed(&mut self, peer: &str, reason: &str) {
        warn!(peer, reason, "handshake failed");
    }

    fn on_disconnected(&mut self, peer: &PeerInfo, reason: &str) {
        info!(%peer, reason, "client disconnected");
        if let Some(routing_id) = peer.routing_id {
            self.remove_session(routing_id);
        }
    }
}

impl<S> Handler for Dispatcher<S>
where
    S: Socket<Address = RoutingId, Event = RouterEvent>,
{
    type Socket = S;
    type Error = ServerError;

    fn parts(&mut self) -> (&mut Reactor, &mut S, Option<&RoutingId>) {
        (&mut self.reactor, &mut self.socket, self.queue.front_address())
    }

    fn dispatch(&mut self, event: Event<RouterEvent>) -> Result<(), ServerError> {
        match event {
            Event::Socket(event) => self.on_router_event(event),
            Event::Writable => {
                self.queue.flush_one(&mut self.reactor, &mut self.socket);
            }
            Event::Timer(id) => debug!(%id, "ignoring unknown timer"),
            Event::Signal(signal) => {
                info!(%signal, "shutdown signal received");
                self.reactor.stop_handle().stop();
            }
            Event::StopRequested => {
                info!(clients = self.sessions.len(), "server stopping");
                self.disconnect_all_clients();
                self.reactor.stop_polling();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
