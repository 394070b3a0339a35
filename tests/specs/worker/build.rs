//! Worker build specs
//!
//! Verify a pushed assembly reaches a worker and its result is persisted.

use crate::prelude::*;

#[tokio::test]
#[serial]
async fn pushed_assembly_is_built_and_recorded() {
    let mut server = ServerFixture::new();
    let repository = server.register(ClientKind::Repository, "webapp");
    let mut worker = WorkerFixture::prepare(&server, &[]);
    server.start();
    worker.launch(&server);
    assert!(worker.wait_for_state(ConnectionState::Waiting), "worker never said hello");

    let mut peer = Peer::connect(&server, repository).await;
    peer.command("push", json!({ "repository": "webapp", "revision": "abc123" })).await;
    let response = peer.recv_kind("push").await;
    let id = AssemblyId(response.payload["assembly_id"].as_u64().unwrap());

    let recorded = wait_for(SPEC_WAIT_MAX_MS, || server.metastore().assembly_result(id).unwrap().is_some());
    assert!(recorded, "no result for assembly {id}");
    let result = server.metastore().assembly_result(id).unwrap().unwrap();
    assert!(result.outcome == assemblage_core::BuildOutcome::Succeeded);

    assert!(worker.wait_for_state(ConnectionState::Waiting));
    worker.stop().unwrap();
    assert_eq!(worker.state(), ConnectionState::Stopping);
}

#[tokio::test]
#[serial]
async fn assembly_waits_for_a_worker_with_matching_tags() {
    let mut server = ServerFixture::new();
    let repository = server.register(ClientKind::Repository, "webapp");
    let mut worker = WorkerFixture::prepare(&server, &["linux".to_string()]);
    server.start();
    worker.launch(&server);
    assert!(worker.wait_for_state(ConnectionState::Waiting));

    let mut peer = Peer::connect(&server, repository).await;
    peer.command("push", json!({ "repository": "webapp", "revision": "abc123", "tags": ["windows"] })).await;
    let id = AssemblyId(peer.recv_kind("push").await.payload["assembly_id"].as_u64().unwrap());

    std::thread::sleep(std::time::Duration::from_millis(200));
    assert!(server.metastore().assembly_result(id).unwrap().is_none());
    assert_eq!(worker.state(), ConnectionState::Waiting);
}
