// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::channel::{AuthError, HandshakeError};
use assemblage_wire::ProtocolError;
use tempfile::tempdir;

type Outcome = (Result<Session, HandshakeError>, Result<Session, HandshakeError>);

async fn run(client: &Identity, expected_server: &PublicKey, server: &Identity, auth: &Authenticator) -> Outcome {
    let (mut a, mut b) = tokio::io::duplex(4096);
    let client_side = async move {
        let result = client_handshake(&mut a, client, expected_server).await;
        drop(a);
        result
    };
    let server_side = async move {
        let result = server_handshake(&mut b, server, auth).await;
        drop(b);
        result
    };
    tokio::join!(client_side, server_side)
}

fn allow_list_with(name: &str, identity: &Identity) -> (tempfile::TempDir, Authenticator) {
    let dir = tempdir().unwrap();
    identity.save_public(&dir.path().join(format!("{name}.toml"))).unwrap();
    let auth = Authenticator::AllowList { remotes_dir: dir.path().to_path_buf() };
    (dir, auth)
}

#[tokio::test]
async fn handshake_exchanges_names_and_keys() {
    let client = Identity::generate("builder-1");
    let server = Identity::generate("assemblage-server");

    let (client_result, server_result) =
        run(&client, server.public_key(), &server, &Authenticator::AllowAny).await;
    let mut client_session = client_result.unwrap();
    let mut server_session = server_result.unwrap();

    assert_eq!(client_session.peer_name, "assemblage-server");
    assert_eq!(server_session.peer_name, "builder-1");

    let up = client_session.sender.seal(b"to server").unwrap();
    assert_eq!(server_session.receiver.open(&up).unwrap(), b"to server");
    let down = server_session.sender.seal(b"to client").unwrap();
    assert_eq!(client_session.receiver.open(&down).unwrap(), b"to client");
}

#[tokio::test]
async fn allow_listed_client_is_accepted() {
    let client = Identity::generate("builder-1");
    let server = Identity::generate("assemblage-server");
    let (_dir, auth) = allow_list_with("builder-1", &client);

    let (client_result, server_result) = run(&client, server.public_key(), &server, &auth).await;

    assert!(client_result.is_ok());
    assert_eq!(server_result.unwrap().peer_name, "builder-1");
}

#[tokio::test]
async fn unknown_client_is_rejected_with_reason() {
    let client = Identity::generate("builder-1");
    let server = Identity::generate("assemblage-server");
    let (_dir, auth) = allow_list_with("someone-else", &Identity::generate("someone-else"));

    let (client_result, server_result) = run(&client, server.public_key(), &server, &auth).await;

    assert!(matches!(client_result, Err(HandshakeError::Rejected(_))));
    assert!(matches!(server_result, Err(HandshakeError::Auth(AuthError::Rejected(_)))));
}

#[tokio::test]
async fn client_declaring_another_name_is_rejected() {
    let client = Identity::generate("impostor");
    let server = Identity::generate("assemblage-server");
    let (_dir, auth) = allow_list_with("builder-1", &Identity::from_public("builder-1", *client.public_key()));

    let (client_result, server_result) = run(&client, server.public_key(), &server, &auth).await;

    assert!(matches!(server_result, Err(HandshakeError::Rejected(_))));
    assert!(client_result.is_err());
}

#[tokio::test]
async fn wrong_server_key_fails_on_both_sides() {
    let client = Identity::generate("builder-1");
    let server = Identity::generate("assemblage-server");
    let expected = Identity::generate("real-server");

    let (client_result, server_result) =
        run(&client, expected.public_key(), &server, &Authenticator::AllowAny).await;

    assert!(matches!(server_result, Err(HandshakeError::Crypto)));
    assert!(matches!(
        client_result,
        Err(HandshakeError::Protocol(ProtocolError::ConnectionClosed))
    ));
}

#[tokio::test]
async fn identity_without_secret_cannot_handshake() {
    let public_only = Identity::from_public("builder-1", *Identity::generate("x").public_key());
    let server = Identity::generate("assemblage-server");

    let (mut a, _b) = tokio::io::duplex(64);
    let result = client_handshake(&mut a, &public_only, server.public_key()).await;

    assert!(matches!(result, Err(HandshakeError::NoSecret)));
}
