//! Server command specs
//!
//! Verify command responses over a real authenticated connection.

use crate::prelude::*;

#[tokio::test]
#[serial]
async fn status_reports_versions_and_running_state() {
    let mut server = ServerFixture::new();
    let identity = server.register(ClientKind::Repository, "webapp");
    server.start();

    let mut peer = Peer::connect(&server, identity).await;
    peer.command("status", json!([])).await;
    let response = peer.recv_kind("status").await;

    assert_eq!(response.success(), Some(true));
    assert_eq!(response.payload["server_version"], assemblage_core::VERSION);
    assert_eq!(response.payload["protocol_version"], wire::VERSION);
    assert_eq!(response.payload["state"], "running");
    assert!(response.payload["uptime"].is_u64());
}

#[tokio::test]
#[serial]
async fn unknown_command_fails_without_ending_the_session() {
    let mut server = ServerFixture::new();
    let identity = server.register(ClientKind::Repository, "webapp");
    server.start();

    let mut peer = Peer::connect(&server, identity).await;
    peer.command("frobnicate", json!([])).await;
    let response = peer.recv_kind("frobnicate").await;
    assert_eq!(response.success(), Some(false));

    peer.command("status", json!([])).await;
    assert_eq!(peer.recv_kind("status").await.success(), Some(true));
}

#[tokio::test]
#[serial]
async fn push_creates_an_assembly() {
    let mut server = ServerFixture::new();
    let identity = server.register(ClientKind::Repository, "webapp");
    server.start();

    let mut peer = Peer::connect(&server, identity).await;
    peer.command("push", json!({ "repository": "webapp", "revision": "abc123" })).await;
    let response = peer.recv_kind("push").await;

    assert_eq!(response.success(), Some(true));
    let id = AssemblyId(response.payload["assembly_id"].as_u64().unwrap());
    let store = server.metastore();
    let descriptor = store.assembly(id).unwrap().unwrap();
    assert_eq!(descriptor.revision, "abc123");
    assert!(store.assembly_result(id).unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn repositories_may_not_report_results() {
    let mut server = ServerFixture::new();
    let identity = server.register(ClientKind::Repository, "webapp");
    server.start();

    let mut peer = Peer::connect(&server, identity).await;
    peer.command("assembly_result", json!({ "assembly_id": 1, "outcome": "succeeded", "message": "" })).await;
    let response = peer.recv_kind("assembly_result").await;

    assert_eq!(response.success(), Some(false));
    assert!(response.payload.as_str().unwrap().contains("may not send"));
}
