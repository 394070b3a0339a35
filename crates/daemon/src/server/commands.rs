// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server command handlers.
//!
//! A failing handler never ends the session: its error becomes a
//! `success: false` response to the sender.

use assemblage_core::{AssemblyRequest, AssemblyResult, ClientKind, StoreError, VERSION};
use assemblage_net::{RouterEvent, RoutingId, Socket};
use assemblage_wire::{Command, Greeting, Message, ServerStatus, StatusReport, UnknownCommand, VERSION as PROTOCOL_VERSION};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::dispatch::Dispatcher;

/// Reported as `state` in status responses
pub const RUNNING_STATE: &str = "running";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Unknown(#[from] UnknownCommand),

    #[error("invalid {command} payload: {reason}")]
    InvalidPayload { command: Command, reason: String },

    #[error("{kind} clients may not send {command}")]
    NotAllowed { command: Command, kind: ClientKind },

    #[error("no session for {0}")]
    NoSession(RoutingId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

fn parse_payload<T: DeserializeOwned>(command: Command, payload: &Value) -> Result<T, CommandError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| CommandError::InvalidPayload { command, reason: e.to_string() })
}

impl<S> Dispatcher<S>
where
    S: Socket<Address = RoutingId, Event = RouterEvent>,
{
    /// Run one command; `Some` is the payload of a successful response.
    pub(crate) fn run_command(&mut self, routing_id: RoutingId, message: &Message) -> Result<Option<Value>, CommandError> {
        let command: Command = message.kind.parse()?;
        debug!(%routing_id, %command, "command received");
        match command {
            Command::Hello => self.handle_hello(routing_id, &message.payload),
            Command::Goodbye => self.handle_goodbye(routing_id),
            Command::Status => self.handle_status(),
            Command::StatusReport => self.handle_status_report(routing_id, &message.payload),
            Command::Push => self.handle_push(routing_id, &message.payload),
            Command::AssemblyResult => self.handle_assembly_result(routing_id, &message.payload),
        }
    }

    fn require_kind(&self, routing_id: RoutingId, command: Command, kind: ClientKind) -> Result<(), CommandError> {
        let session = self.session(routing_id).ok_or(CommandError::NoSession(routing_id))?;
        if session.kind() != kind {
            return Err(CommandError::NotAllowed { command, kind: session.kind() });
        }
        Ok(())
    }

    fn handle_hello(&mut self, routing_id: RoutingId, payload: &Value) -> Result<Option<Value>, CommandError> {
        let greeting = Greeting::from_payload(payload).ok_or_else(|| CommandError::InvalidPayload {
            command: Command::Hello,
            reason: "expected [kind, version, timestamp]".to_string(),
        })?;
        info!(%routing_id, kind = %greeting.kind, version = %greeting.version, "client said hello");
        Ok(Some(Value::Null))
    }

    fn handle_goodbye(&mut self, routing_id: RoutingId) -> Result<Option<Value>, CommandError> {
        info!(%routing_id, "client said goodbye");
        self.remove_session(routing_id);
        Ok(None)
    }

    fn handle_status(&mut self) -> Result<Option<Value>, CommandError> {
        let status = ServerStatus {
            server_version: VERSION.to_string(),
            protocol_version: PROTOCOL_VERSION,
            uptime: self.start_time.elapsed().as_secs(),
            state: RUNNING_STATE.to_string(),
        };
        Ok(Some(serde_json::to_value(status)?))
    }

    fn handle_status_report(&mut self, routing_id: RoutingId, payload: &Value) -> Result<Option<Value>, CommandError> {
        match serde_json::from_value::<StatusReport>(payload.clone()) {
            Ok(report) => info!(
                %routing_id,
                version = %report.version,
                state = %report.state,
                uptime = report.uptime,
                "status report"
            ),
            Err(_) => info!(%routing_id, report = %payload, "status report"),
        }
        Ok(None)
    }

    fn handle_push(&mut self, routing_id: RoutingId, payload: &Value) -> Result<Option<Value>, CommandError> {
        self.require_kind(routing_id, Command::Push, ClientKind::Repository)?;
        let request: AssemblyRequest = parse_payload(Command::Push, payload)?;
        let descriptor = self.metastore.create_assembly(request)?;
        info!(
            %routing_id,
            assembly = %descriptor.id,
            repository = %descriptor.repository,
            revision = %descriptor.revision,
            "assembly created"
        );
        let id = descriptor.id;
        self.pending.push_back(descriptor);
        self.dispatch_pending();
        Ok(Some(json!({ "assembly_id": id })))
    }

    fn handle_assembly_result(&mut self, routing_id: RoutingId, payload: &Value) -> Result<Option<Value>, CommandError> {
        self.require_kind(routing_id, Command::AssemblyResult, ClientKind::Worker)?;
        let result: AssemblyResult = parse_payload(Command::AssemblyResult, payload)?;
        let session = self.sessions.get_mut(&routing_id).ok_or(CommandError::NoSession(routing_id))?;
        let client = session.record.id;

        self.metastore.record_assembly_result(client, &result)?;
        info!(%routing_id, assembly = %result.assembly_id, outcome = ?result.outcome, "assembly result recorded");

        if session.assigned.as_ref().map(|d| d.id) == Some(result.assembly_id) {
            session.assigned = None;
            self.dispatch_pending();
        } else {
            warn!(%routing_id, assembly = %result.assembly_id, "result for an assembly not assigned to this worker");
        }
        Ok(Some(json!({ "assembly_id": result.assembly_id })))
    }
}
