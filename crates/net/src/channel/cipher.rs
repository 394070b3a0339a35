// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-direction AEAD state and the encrypted frame layout.
//!
//! Plaintext of every encrypted frame: one kind byte, then the body.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};

use super::HandshakeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Message = 0,
    Ping = 1,
    Ready = 2,
}

impl FrameKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(FrameKind::Message),
            1 => Some(FrameKind::Ping),
            2 => Some(FrameKind::Ready),
            _ => None,
        }
    }
}

/// ChaCha20-Poly1305 with a counter nonce.
///
/// Each direction of a link has its own key, so a nonce is never reused as
/// long as the counter only moves forward.
pub(crate) struct CipherState {
    aead: ChaCha20Poly1305,
    counter: u64,
}

impl CipherState {
    pub(crate) fn new(key: [u8; 32]) -> Self {
        Self { aead: ChaCha20Poly1305::new(Key::from_slice(&key)), counter: 0 }
    }

    fn next_nonce(&mut self) -> Result<[u8; 12], HandshakeError> {
        let mut nonce = [0u8; 12];
        nonce[4..].copy_from_slice(&self.counter.to_le_bytes());
        self.counter = self.counter.checked_add(1).ok_or(HandshakeError::NonceExhausted)?;
        Ok(nonce)
    }

    pub(crate) fn seal(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, HandshakeError> {
        let nonce = self.next_nonce()?;
        self.aead.encrypt(Nonce::from_slice(&nonce), plaintext).map_err(|_| HandshakeError::Crypto)
    }

    pub(crate) fn open(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, HandshakeError> {
        let nonce = self.next_nonce()?;
        self.aead.decrypt(Nonce::from_slice(&nonce), ciphertext).map_err(|_| HandshakeError::Crypto)
    }
}

pub(crate) fn seal_frame(
    cipher: &mut CipherState,
    kind: FrameKind,
    body: &[u8],
) -> Result<Vec<u8>, HandshakeError> {
    let mut plaintext = Vec::with_capacity(1 + body.len());
    plaintext.push(kind as u8);
    plaintext.extend_from_slice(body);
    cipher.seal(&plaintext)
}

pub(crate) fn open_frame(
    cipher: &mut CipherState,
    frame: &[u8],
) -> Result<(FrameKind, Vec<u8>), HandshakeError> {
    let plaintext = cipher.open(frame)?;
    let (&kind, body) = plaintext.split_first().ok_or(HandshakeError::BadFrame)?;
    let kind = FrameKind::from_byte(kind).ok_or(HandshakeError::BadFrame)?;
    Ok((kind, body.to_vec()))
}
