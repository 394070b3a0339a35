// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message type taxonomy.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Command types the server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Hello,
    Goodbye,
    Status,
    StatusReport,
    Push,
    AssemblyResult,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Hello,
        Command::Goodbye,
        Command::Status,
        Command::StatusReport,
        Command::Push,
        Command::AssemblyResult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Hello => "hello",
            Command::Goodbye => "goodbye",
            Command::Status => "status",
            Command::StatusReport => "status_report",
            Command::Push => "push",
            Command::AssemblyResult => "assembly_result",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

/// Non-response message types the server sends to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    Hello,
    Goodbye,
    NewAssembly,
    Control,
    Error,
}

impl Notice {
    pub const ALL: [Notice; 5] =
        [Notice::Hello, Notice::Goodbye, Notice::NewAssembly, Notice::Control, Notice::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Notice::Hello => "hello",
            Notice::Goodbye => "goodbye",
            Notice::NewAssembly => "new_assembly",
            Notice::Control => "control",
            Notice::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Notice::ALL.into_iter().find(|n| n.as_str() == s)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions carried by `control` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Disconnect,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Disconnect => "disconnect",
        }
    }

    /// Parse a `control` payload such as `["disconnect"]`.
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        match payload.get(0).and_then(|v| v.as_str()) {
            Some("disconnect") => Some(ControlAction::Disconnect),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
