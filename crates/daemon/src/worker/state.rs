// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker's connection state machine.
//!
//! | From | Event | To |
//! |---|---|---|
//! | unstarted | start | connecting |
//! | connecting | hello | waiting |
//! | waiting | new_assembly | working |
//! | working | assembly finished, queue empty | waiting |
//! | waiting | goodbye | connecting |
//! | any but stopping | stop | stopping |
//!
//! `stopping` is terminal.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Unstarted,
    Connecting,
    Waiting,
    Working,
    Stopping,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Unstarted => "unstarted",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Waiting => "waiting",
            ConnectionState::Working => "working",
            ConnectionState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    Start,
    Hello,
    NewAssembly,
    AssemblyFinished { queue_empty: bool },
    Goodbye,
    Stop,
}

impl fmt::Display for StateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StateEvent::Start => "start",
            StateEvent::Hello => "hello",
            StateEvent::NewAssembly => "new_assembly",
            StateEvent::AssemblyFinished { .. } => "assembly_finished",
            StateEvent::Goodbye => "goodbye",
            StateEvent::Stop => "stop",
        })
    }
}

/// Outcome of offering an event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Accepted { from: ConnectionState, to: ConnectionState },
    /// The event is valid here but leaves the state unchanged
    Held(ConnectionState),
    Rejected { state: ConnectionState, event: StateEvent },
}

impl Transition {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Transition::Rejected { .. })
    }
}

/// Apply the transition table.
pub fn next(state: ConnectionState, event: StateEvent) -> Transition {
    use ConnectionState::*;

    let to = match (state, event) {
        (Stopping, StateEvent::Stop) => return Transition::Held(Stopping),
        (_, StateEvent::Stop) => Stopping,
        (Unstarted, StateEvent::Start) => Connecting,
        (Connecting, StateEvent::Hello) => Waiting,
        (Waiting, StateEvent::NewAssembly) => Working,
        (Working, StateEvent::NewAssembly) => return Transition::Held(Working),
        (Working, StateEvent::AssemblyFinished { queue_empty: true }) => Waiting,
        (Working, StateEvent::AssemblyFinished { queue_empty: false }) => return Transition::Held(Working),
        (Waiting, StateEvent::Goodbye) => Connecting,
        _ => return Transition::Rejected { state, event },
    };
    Transition::Accepted { from: state, to }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
