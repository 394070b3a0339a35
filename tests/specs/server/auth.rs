//! Server authentication specs
//!
//! Verify only allow-listed keys get a session.

use crate::prelude::*;

#[tokio::test]
#[serial]
async fn registered_client_is_greeted_with_hello() {
    let mut server = ServerFixture::new();
    let identity = server.register(ClientKind::Repository, "webapp");
    server.start();

    let mut peer = Peer::connect(&server, identity).await;
    let hello = peer.recv().await;

    assert_eq!(hello.kind, "hello");
    assert_eq!(hello.payload[0], "server");
    assert_eq!(hello.payload[1], assemblage_core::VERSION);
}

#[tokio::test]
#[serial]
async fn unregistered_key_is_refused() {
    let server = ServerFixture::running();

    let stranger = Arc::new(Identity::generate("stranger"));
    let reason = Peer::refused(&server, stranger).await;

    assert!(!reason.is_empty());
}

#[tokio::test]
#[serial]
async fn client_registered_while_running_is_greeted_and_kept() {
    let mut server = ServerFixture::running();
    let repository = server.register(ClientKind::Repository, "webapp");

    let mut peer = Peer::connect(&server, repository).await;
    assert_eq!(peer.recv().await.kind, "hello");
    peer.command("push", json!({ "repository": "webapp", "revision": "abc123" })).await;
    let response = peer.recv_kind("push").await;
    assert_eq!(response.success(), Some(true));

    // The push rewrote the database; the client added beside the server survives it
    server.stop().unwrap();
    let store = server.metastore();
    assert!(store.find_client("webapp").unwrap().is_some());
    let id = AssemblyId(response.payload["assembly_id"].as_u64().unwrap());
    assert!(store.assembly(id).unwrap().is_some());
}
