// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed framing.
//!
//! Wire format: 4-byte length prefix (big-endian) + frame body

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame body accepted from a peer
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const PREFIX_LEN: usize = 4;

/// Malformed or incompatible wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    FrameTooLarge(usize),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("malformed message header: no version")]
    MissingVersion,

    #[error("version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u64, got: serde_json::Value },

    #[error("malformed message header: no type")]
    MissingType,

    #[error("malformed message type: {0:?}")]
    InvalidType(String),
}

impl From<rmp_serde::decode::Error> for ProtocolError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for ProtocolError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}

/// Prefix `body` with its length.
pub fn frame(body: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if body.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(body.len()));
    }
    let mut framed = Vec::with_capacity(PREFIX_LEN + body.len());
    framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
    framed.extend_from_slice(body);
    Ok(framed)
}

/// Remove one complete frame from the front of `buf`, if one has arrived.
///
/// Leaves `buf` untouched when the frame is still incomplete, so callers can
/// keep appending bytes as they are read.
pub fn take_frame(buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, ProtocolError> {
    if buf.len() < PREFIX_LEN {
        return Ok(None);
    }
    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    if buf.len() < PREFIX_LEN + len {
        return Ok(None);
    }
    let body = buf[PREFIX_LEN..PREFIX_LEN + len].to_vec();
    buf.drain(..PREFIX_LEN + len);
    Ok(Some(body))
}

/// Write one frame.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&frame(body)?).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; PREFIX_LEN];
    if let Err(e) = reader.read_exact(&mut prefix).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(ProtocolError::ConnectionClosed);
        }
        return Err(e.into());
    }
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
