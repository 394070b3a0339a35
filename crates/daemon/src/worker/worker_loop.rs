// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker's side of the reactor loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assemblage_core::{AssemblyBuilder, AssemblyDescriptor, AssemblyResult, BuildStep, BuilderFactory, VERSION};
use assemblage_net::{
    ConnectionObserver, Connector, DealerEvent, Endpoint, Event, Handler, OutboundFrame, OutputQueue, PeerInfo,
    Reactor, TimerId,
};
use assemblage_wire::{self as wire, Command, ControlAction, Greeting, Header, Message, Notice, StatusReport};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::state::{self, ConnectionState, StateEvent, Transition};
use super::WorkerError;

/// Timer periods for a [`WorkerLoop`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timing {
    pub build_tick: Duration,
    pub status_interval: Duration,
}

pub(crate) struct WorkerLoop<S: Connector> {
    pub(super) reactor: Reactor,
    pub(super) socket: S,
    pub(super) queue: OutputQueue<()>,
    endpoint: Endpoint,
    timing: Timing,
    state: Arc<Mutex<ConnectionState>>,
    factory: Box<dyn BuilderFactory>,
    /// Head is the build being advanced
    pub(super) builders: VecDeque<Box<dyn AssemblyBuilder>>,
    pub(super) build_timer: Option<TimerId>,
    pub(super) status_timer: Option<TimerId>,
    /// Flush queued messages before closing on exit
    pub(super) drain_on_exit: bool,
    start_time: Instant,
}

impl<S> WorkerLoop<S>
where
    S: Connector<Address = (), Event = DealerEvent>,
{
    pub(crate) fn new(
        reactor: Reactor,
        socket: S,
        endpoint: Endpoint,
        timing: Timing,
        factory: Box<dyn BuilderFactory>,
        state: Arc<Mutex<ConnectionState>>,
    ) -> Self {
        Self {
            reactor,
            socket,
            queue: OutputQueue::new(),
            endpoint,
            timing,
            state,
            factory,
            builders: VecDeque::new(),
            build_timer: None,
            status_timer: None,
            drain_on_exit: false,
            start_time: Instant::now(),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Start the build timer and begin connecting. Needs a tokio runtime.
    pub(crate) fn start(&mut self) {
        self.build_timer = Some(self.reactor.register_periodic_timer(self.timing.build_tick));
        self.fire(StateEvent::Start);
    }

    /// Offer `event` to the state machine and run the side effects of an accepted transition.
    pub(crate) fn fire(&mut self, event: StateEvent) -> Transition {
        let current = self.state();
        let transition = state::next(current, event);
        match transition {
            Transition::Accepted { from, to } => {
                info!(%from, %to, %event, "worker state changed");
                *self.state.lock() = to;
                self.on_transition(from, to);
            }
            Transition::Held(state) => debug!(%state, %event, "worker state unchanged"),
            Transition::Rejected { state, event } => warn!(%state, %event, "worker state transition failed"),
        }
        transition
    }

    fn on_transition(&mut self, from: ConnectionState, to: ConnectionState) {
        use ConnectionState::*;

        match (from, to) {
            (Connecting, Waiting) => {
                self.status_timer = Some(self.reactor.register_periodic_timer(self.timing.status_interval));
            }
            (Waiting, Connecting) => self.remove_status_timer(),
            (Waiting | Working, Stopping) => {
                self.remove_timers();
                match wire::goodbye() {
                    Ok(bytes) => self.send(bytes),
                    Err(e) => warn!(error = %e, "failed to encode goodbye"),
                }
                self.drain_on_exit = true;
                self.reactor.stop_polling();
            }
            (_, Stopping) => {
                self.remove_timers();
                self.socket.close();
                self.reactor.stop_polling();
            }
            _ => {}
        }
    }

    fn remove_status_timer(&mut self) {
        if let Some(id) = self.status_timer.take() {
            self.reactor.remove_timer(id);
        }
    }

    fn remove_timers(&mut self) {
        self.remove_status_timer();
        if let Some(id) = self.build_timer.take() {
            self.reactor.remove_timer(id);
        }
    }

    fn send(&mut self, bytes: Vec<u8>) {
        self.queue.enqueue(&mut self.reactor, OutboundFrame::new((), bytes));
    }

    fn on_dealer_event(&mut self, event: DealerEvent) -> Result<(), WorkerError> {
        match event {
            DealerEvent::Connected { server_name } => {
                let endpoint = self.endpoint.clone();
                self.on_connected(&endpoint);
                self.on_handshake_succeeded(&PeerInfo { routing_id: None, name: server_name });
                self.send(wire::hello("worker", VERSION)?);
            }
            DealerEvent::ConnectFailed { reason } => {
                let endpoint = self.endpoint.to_string();
                self.on_handshake_failed(&endpoint, &reason);
            }
            DealerEvent::Message(bytes) => self.on_message(&bytes)?,
            DealerEvent::Disconnected { reason } => {
                let peer = PeerInfo { routing_id: None, name: self.endpoint.to_string() };
                self.on_disconnected(&peer, &reason);
            }
        }
        Ok(())
    }

    /// Handle one message from the server.
    ///
    /// Anything outside the handled set ends the connection with an error.
    pub(crate) fn on_message(&mut self, bytes: &[u8]) -> Result<(), WorkerError> {
        let message = wire::decode(bytes)?;
        if message.is_response() {
            return self.on_response(message);
        }
        match Notice::parse(&message.kind) {
            Some(Notice::Hello) => self.on_hello(&message.payload),
            Some(Notice::Goodbye) => self.on_goodbye(),
            Some(Notice::NewAssembly) => self.on_new_assembly(&message.payload)?,
            Some(Notice::Control) => self.on_control(&message.payload)?,
            Some(Notice::Error) => warn!(error = %message.payload, "server reported an error"),
            None => return Err(WorkerError::UnhandledMessageType(message.kind)),
        }
        Ok(())
    }

    fn on_response(&mut self, message: Message) -> Result<(), WorkerError> {
        let known = message.kind.parse::<Command>().is_ok() || Notice::parse(&message.kind) == Some(Notice::Error);
        if !known {
            return Err(WorkerError::UnhandledMessageType(message.kind));
        }
        if message.success() == Some(true) {
            debug!(kind = %message.kind, "command acknowledged");
        } else {
            warn!(kind = %message.kind, error = %message.payload, "command failed on server");
        }
        Ok(())
    }

    fn on_hello(&mut self, payload: &Value) {
        match Greeting::from_payload(payload) {
            Some(greeting) => info!(kind = %greeting.kind, version = %greeting.version, "server said hello"),
            None => debug!(%payload, "hello with unexpected payload"),
        }
        self.fire(StateEvent::Hello);
    }

    fn on_goodbye(&mut self) {
        info!("server said goodbye");
        if !self.fire(StateEvent::Goodbye).is_rejected() {
            self.socket.reconnect();
        }
    }

    fn on_control(&mut self, payload: &Value) -> Result<(), WorkerError> {
        match ControlAction::from_payload(payload) {
            Some(ControlAction::Disconnect) => {
                info!("server asked to disconnect");
                if !self.fire(StateEvent::Goodbye).is_rejected() {
                    self.socket.reconnect();
                }
                Ok(())
            }
            None => Err(WorkerError::InvalidPayload { kind: Notice::Control.as_str(), reason: payload.to_string() }),
        }
    }

    fn on_new_assembly(&mut self, payload: &Value) -> Result<(), WorkerError> {
        let descriptor: AssemblyDescriptor = serde_json::from_value(payload.clone())
            .map_err(|e| WorkerError::InvalidPayload { kind: Notice::NewAssembly.as_str(), reason: e.to_string() })?;
        if self.fire(StateEvent::NewAssembly).is_rejected() {
            warn!(assembly = %descriptor.id, "ignoring assembly");
            return Ok(());
        }
        info!(assembly = %descriptor.id, repository = %descriptor.repository, "assembly queued");
        self.builders.push_back(self.factory.start(descriptor));
        Ok(())
    }

    /// Advance the head builder by one step.
    pub(crate) fn advance_build(&mut self) -> Result<(), WorkerError> {
        let Some(builder) = self.builders.front_mut() else {
            return Ok(());
        };
        let BuildStep::Finished(result) = builder.advance() else {
            return Ok(());
        };
        self.builders.pop_front();
        self.send_result(&result)?;
        self.fire(StateEvent::AssemblyFinished { queue_empty: self.builders.is_empty() });
        Ok(())
    }

    fn send_result(&mut self, result: &AssemblyResult) -> Result<(), WorkerError> {
        info!(assembly = %result.assembly_id, outcome = ?result.outcome, "assembly finished");
        let payload = serde_json::to_value(result)
            .map_err(|e| WorkerError::InvalidPayload { kind: Command::AssemblyResult.as_str(), reason: e.to_string() })?;
        self.send(wire::encode(Command::AssemblyResult.as_str(), &payload, Header::new())?);
        Ok(())
    }

    pub(crate) fn send_status_report(&mut self) -> Result<(), WorkerError> {
        let report = StatusReport {
            version: VERSION.to_string(),
            state: self.state().to_string(),
            uptime: self.start_time.elapsed().as_secs(),
        };
        let payload = serde_json::to_value(report)
            .map_err(|e| WorkerError::InvalidPayload { kind: Command::StatusReport.as_str(), reason: e.to_string() })?;
        self.send(wire::encode(Command::StatusReport.as_str(), &payload, Header::new())?);
        Ok(())
    }

    /// Flush or discard what is left after the loop stops, then close once
    /// the flushed frames are on the wire. Both steps share `timeout`.
    pub(crate) async fn finish(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        if self.drain_on_exit {
            self.queue.drain(&mut self.reactor, &mut self.socket, timeout).await;
        }
        self.socket.shutdown(deadline.saturating_duration_since(Instant::now())).await;
    }
}

impl<S> ConnectionObserver for WorkerLoop<S>
where
    S: Connector<Address = (), Event = DealerEvent>,
{
    fn on_connected(&mut self, endpoint: &Endpoint) {
        info!(%endpoint, "connected to server");
    }

    fn on_handshake_failed(&mut self, peer: &str, reason: &str) {
        warn!(peer, reason, "connection to server failed");
    }

    fn on_disconnected(&mut self, peer: &PeerInfo, reason: &str) {
        info!(%peer, reason, "disconnected from server");
        self.fire(StateEvent::Goodbye);
    }
}

impl<S> Handler for WorkerLoop<S>
where
    S: Connector<Address = (), Event = DealerEvent>,
{
    type Socket = S;
    type Error = WorkerError;

    fn parts(&mut self) -> (&mut Reactor, &mut S, Option<&()>) {
        (&mut self.reactor, &mut self.socket, self.queue.front_address())
    }

    fn dispatch(&mut self, event: Event<DealerEvent>) -> Result<(), WorkerError> {
        match event {
            Event::Socket(event) => self.on_dealer_event(event)?,
            Event::Writable => {
                self.queue.flush_one(&mut self.reactor, &mut self.socket);
            }
            Event::Timer(id) if Some(id) == self.build_timer => self.advance_build()?,
            Event::Timer(id) if Some(id) == self.status_timer => self.send_status_report()?,
            Event::Timer(id) => debug!(%id, "ignoring stale timer"),
            Event::Signal(signal) => {
                info!(%signal, "shutdown signal received");
                self.reactor.stop_handle().stop();
            }
            Event::StopRequested => {
                self.fire(StateEvent::Stop);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "worker_loop_tests.rs"]
mod tests;
