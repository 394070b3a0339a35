// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message envelope: header map plus payload.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::wire::ProtocolError;

/// Protocol version stamped on every message
pub const VERSION: u64 = 1;

pub const VERSION_KEY: &str = "version";
pub const TYPE_KEY: &str = "type";
pub const SUCCESS_KEY: &str = "success";

/// String-keyed message header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header(Map<String, Value>);

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Overwrite entries with those of `other`.
    pub fn merge(&mut self, other: Header) {
        self.0.extend(other.0);
    }

    pub fn version(&self) -> Option<u64> {
        self.get(VERSION_KEY).and_then(Value::as_u64)
    }

    /// `Some` only on responses.
    pub fn success(&self) -> Option<bool> {
        self.get(SUCCESS_KEY).and_then(Value::as_bool)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Header {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A decoded message.
///
/// `kind` is lifted out of the header; everything else, including the
/// version, stays in `header`.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: String,
    pub payload: Value,
    pub header: Header,
}

impl Message {
    pub fn is_response(&self) -> bool {
        self.header.contains_key(SUCCESS_KEY)
    }

    pub fn success(&self) -> Option<bool> {
        self.header.success()
    }
}

/// Whether `kind` is a well-formed message type: a lowercase ASCII letter
/// followed by one or more word characters.
pub fn is_valid_type(kind: &str) -> bool {
    let Some((first, rest)) = kind.as_bytes().split_first() else {
        return false;
    };
    first.is_ascii_lowercase() && !rest.is_empty() && rest.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
}

fn check_header(header: &Header) -> Result<(), ProtocolError> {
    match header.get(VERSION_KEY) {
        None => return Err(ProtocolError::MissingVersion),
        Some(v) if v.as_u64() == Some(VERSION) => {}
        Some(v) => return Err(ProtocolError::VersionMismatch { expected: VERSION, got: v.clone() }),
    }
    match header.get(TYPE_KEY) {
        None => Err(ProtocolError::MissingType),
        Some(Value::String(kind)) if is_valid_type(kind) => Ok(()),
        Some(other) => Err(ProtocolError::InvalidType(other.to_string())),
    }
}

/// Encode a message of type `kind`.
///
/// The version is filled in first and the type last, so extra header fields
/// may override the version (and then fail validation) but never the type.
pub fn encode(kind: &str, payload: &Value, header: Header) -> Result<Vec<u8>, ProtocolError> {
    let mut full = Header::new().with(VERSION_KEY, VERSION);
    full.merge(header);
    full.insert(TYPE_KEY, kind);
    check_header(&full)?;
    Ok(rmp_serde::to_vec(&(&full, payload))?)
}

/// Decode and validate a message.
pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
    let (mut header, payload): (Header, Value) = rmp_serde::from_slice(bytes)?;
    check_header(&header)?;
    let kind = match header.remove(TYPE_KEY) {
        Some(Value::String(kind)) => kind,
        _ => return Err(ProtocolError::MissingType),
    };
    Ok(Message { kind, payload, header })
}

/// `hello` announcing the sender's kind and version.
pub fn hello(sender_kind: &str, sender_version: &str) -> Result<Vec<u8>, ProtocolError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    encode("hello", &serde_json::json!([sender_kind, sender_version, timestamp]), Header::new())
}

/// `goodbye` with an empty payload.
pub fn goodbye() -> Result<Vec<u8>, ProtocolError> {
    encode("goodbye", &Value::Array(Vec::new()), Header::new())
}

/// Response to a message of type `kind`.
pub fn response(kind: &str, success: bool, payload: &Value) -> Result<Vec<u8>, ProtocolError> {
    encode(kind, payload, Header::new().with(SUCCESS_KEY, success))
}

/// Failed response whose payload is the error text.
pub fn error_response(kind: &str, message: &str) -> Result<Vec<u8>, ProtocolError> {
    response(kind, false, &Value::String(message.to_string()))
}

/// `control` message carrying a single action.
pub fn control(action: &str) -> Result<Vec<u8>, ProtocolError> {
    encode("control", &serde_json::json!([action]), Header::new())
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
