// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assemblage hub protocol.
//!
//! Every transport frame carries one message: a MessagePack array of two
//! elements, a string-keyed header map and an opaque payload.
//!
//! ```text
//! [ { "version": 1, "type": "status", ...extra header fields... }, <payload> ]
//! ```

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod command;
mod message;
mod status;
mod wire;

pub use command::{Command, ControlAction, Notice, UnknownCommand};
pub use message::{
    control, decode, encode, error_response, goodbye, hello, is_valid_type, response, Header,
    Message, SUCCESS_KEY, TYPE_KEY, VERSION, VERSION_KEY,
};
pub use status::{Greeting, ServerStatus, StatusReport};
pub use wire::{frame, read_frame, take_frame, write_frame, ProtocolError, MAX_FRAME_LEN};

#[cfg(test)]
mod property_tests;
