// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutually authenticated key exchange.
//!
//! ```text
//! client -> server   MAGIC | client static pub | client ephemeral pub
//! server -> client   MAGIC | server ephemeral pub        (or REJECT | reason)
//! client -> server   seal(c2s, READY | client name)
//! server -> client   seal(s2c, READY | server name)
//! ```
//!
//! Both directions' keys come from HKDF-SHA256 over three X25519 results:
//! ephemeral-ephemeral, client static with server ephemeral, and client
//! ephemeral with server static. A side missing its static secret derives
//! different keys and fails to open the READY frame.

use assemblage_core::is_valid_name;
use assemblage_wire::{read_frame, write_frame};
use hkdf::Hkdf;
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncWrite};
use x25519_dalek::{PublicKey, SharedSecret, StaticSecret};

use super::auth::Authenticator;
use super::cipher::{open_frame, seal_frame, CipherState, FrameKind};
use super::identity::Identity;
use super::{HandshakeError, AUTH_DOMAIN};

const MAGIC: &[u8; 4] = b"ASM\x01";
const REJECT: &[u8; 4] = b"ERR!";
const KEY_LEN: usize = 32;

/// An established link's keys and the authenticated peer.
pub(crate) struct Session {
    pub peer_name: String,
    pub sender: CipherState,
    pub receiver: CipherState,
}

/// Run the connecting side against a server whose static key is `server_key`.
pub(crate) async fn client_handshake<S>(
    stream: &mut S,
    local: &Identity,
    server_key: &PublicKey,
) -> Result<Session, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let secret = local.secret().ok_or(HandshakeError::NoSecret)?;
    let ephemeral = StaticSecret::random_from_rng(OsRng);
    let ephemeral_pub = PublicKey::from(&ephemeral);

    let mut hello = MAGIC.to_vec();
    hello.extend_from_slice(local.public_key().as_bytes());
    hello.extend_from_slice(ephemeral_pub.as_bytes());
    write_frame(stream, &hello).await?;

    let reply = read_frame(stream).await?;
    if let Some(reason) = reply.strip_prefix(REJECT) {
        return Err(HandshakeError::Rejected(String::from_utf8_lossy(reason).into_owned()));
    }
    let server_ephemeral = match reply.strip_prefix(MAGIC) {
        Some(rest) => read_key(rest)?,
        None => return Err(HandshakeError::BadFrame),
    };

    let shared = [
        ephemeral.diffie_hellman(&server_ephemeral),
        secret.diffie_hellman(&server_ephemeral),
        ephemeral.diffie_hellman(server_key),
    ];
    let transcript = transcript(local.public_key(), &ephemeral_pub, server_key, &server_ephemeral);
    let (c2s, s2c) = derive_keys(&shared, &transcript)?;
    let mut sender = CipherState::new(c2s);
    let mut receiver = CipherState::new(s2c);

    write_frame(stream, &seal_frame(&mut sender, FrameKind::Ready, local.name().as_bytes())?).await?;
    let peer_name = read_ready(stream, &mut receiver).await?;

    Ok(Session { peer_name, sender, receiver })
}

/// Run the accepting side, consulting `authenticator` before replying.
pub(crate) async fn server_handshake<S>(
    stream: &mut S,
    local: &Identity,
    authenticator: &Authenticator,
) -> Result<Session, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let secret = local.secret().ok_or(HandshakeError::NoSecret)?;

    let hello = read_frame(stream).await?;
    let rest = hello.strip_prefix(MAGIC).ok_or(HandshakeError::BadFrame)?;
    if rest.len() != 2 * KEY_LEN {
        return Err(HandshakeError::BadFrame);
    }
    let client_static = read_key(&rest[..KEY_LEN])?;
    let client_ephemeral = read_key(&rest[KEY_LEN..])?;

    let allowed_name = match authenticator.authenticate(&client_static) {
        Ok(name) => name,
        Err(e) => {
            reject(stream, &e.to_string()).await;
            return Err(e.into());
        }
    };

    let ephemeral = StaticSecret::random_from_rng(OsRng);
    let ephemeral_pub = PublicKey::from(&ephemeral);
    let mut reply = MAGIC.to_vec();
    reply.extend_from_slice(ephemeral_pub.as_bytes());
    write_frame(stream, &reply).await?;

    let shared = [
        ephemeral.diffie_hellman(&client_ephemeral),
        ephemeral.diffie_hellman(&client_static),
        secret.diffie_hellman(&client_ephemeral),
    ];
    let transcript = transcript(&client_static, &client_ephemeral, local.public_key(), &ephemeral_pub);
    let (c2s, s2c) = derive_keys(&shared, &transcript)?;
    let mut sender = CipherState::new(s2c);
    let mut receiver = CipherState::new(c2s);

    let peer_name = read_ready(stream, &mut receiver).await?;
    if !is_valid_name(&peer_name) {
        return Err(HandshakeError::Rejected(format!("invalid client name {peer_name:?}")));
    }
    if let Some(expected) = allowed_name {
        if expected != peer_name {
            return Err(HandshakeError::Rejected(format!(
                "client declared {peer_name:?} but key belongs to {expected:?}"
            )));
        }
    }

    write_frame(stream, &seal_frame(&mut sender, FrameKind::Ready, local.name().as_bytes())?).await?;
    Ok(Session { peer_name, sender, receiver })
}

async fn reject<S: AsyncWrite + Unpin>(stream: &mut S, reason: &str) {
    let mut frame = REJECT.to_vec();
    frame.extend_from_slice(reason.as_bytes());
    // Best effort; the peer may already be gone
    let _ = write_frame(stream, &frame).await;
}

async fn read_ready<S>(stream: &mut S, receiver: &mut CipherState) -> Result<String, HandshakeError>
where
    S: AsyncRead + Unpin,
{
    let frame = read_frame(stream).await?;
    match open_frame(receiver, &frame)? {
        (FrameKind::Ready, body) => String::from_utf8(body).map_err(|_| HandshakeError::BadFrame),
        _ => Err(HandshakeError::BadFrame),
    }
}

fn read_key(bytes: &[u8]) -> Result<PublicKey, HandshakeError> {
    let key = <[u8; KEY_LEN]>::try_from(bytes).map_err(|_| HandshakeError::BadFrame)?;
    Ok(PublicKey::from(key))
}

fn transcript(
    client_static: &PublicKey,
    client_ephemeral: &PublicKey,
    server_static: &PublicKey,
    server_ephemeral: &PublicKey,
) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(AUTH_DOMAIN.as_bytes());
    hasher.update(client_static.as_bytes());
    hasher.update(client_ephemeral.as_bytes());
    hasher.update(server_static.as_bytes());
    hasher.update(server_ephemeral.as_bytes());
    hasher.finalize().to_vec()
}

fn derive_keys(
    shared: &[SharedSecret; 3],
    transcript: &[u8],
) -> Result<([u8; KEY_LEN], [u8; KEY_LEN]), HandshakeError> {
    let mut ikm = Vec::with_capacity(3 * KEY_LEN);
    for secret in shared {
        if !secret.was_contributory() {
            return Err(HandshakeError::WeakKey);
        }
        ikm.extend_from_slice(secret.as_bytes());
    }
    let hk = Hkdf::<Sha256>::new(Some(AUTH_DOMAIN.as_bytes()), &ikm);
    let mut c2s = [0u8; KEY_LEN];
    let mut s2c = [0u8; KEY_LEN];
    hk.expand(&[transcript, &b"c2s"[..]].concat(), &mut c2s).map_err(|_| HandshakeError::Crypto)?;
    hk.expand(&[transcript, &b"s2c"[..]].concat(), &mut s2c).map_err(|_| HandshakeError::Crypto)?;
    Ok((c2s, s2c))
}

#[cfg(test)]
#[path = "handshake_tests.rs"]
mod tests;
