//! Worker shutdown specs
//!
//! Verify a stopping worker says goodbye before its connection goes away.

use std::time::Duration;

use assemblage_net::{Authenticator, RouterEvent, RouterOptions, RouterSocket};

use crate::prelude::*;

const STEP: Duration = Duration::from_millis(20);

async fn next_router_event(router: &mut RouterSocket) -> Option<RouterEvent> {
    match tokio::time::timeout(STEP, router.ready(None)).await {
        Ok(Readiness::Event(event)) => Some(event),
        _ => None,
    }
}

#[tokio::test]
#[serial]
async fn stopping_worker_says_goodbye_to_the_server() {
    let server = Arc::new(Identity::generate("assemblage-server"));
    let mut router = RouterSocket::bind(
        &"tcp://127.0.0.1:0".parse().unwrap(),
        RouterOptions {
            identity: Arc::clone(&server),
            authenticator: Arc::new(Authenticator::AllowAny),
            heartbeat: Heartbeat::default(),
        },
    )
    .await
    .unwrap();

    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("worker");
    bootstrap::setup_run_directory(&dir, Role::Worker).unwrap();
    bootstrap::generate_cert(&dir, Role::Worker).unwrap();
    Config::update(&dir, |c| {
        c.worker.status_interval_ms = 50;
        c.worker.reconnect_interval_ms = 50;
    })
    .unwrap();
    bootstrap::add_server(&dir, &router.endpoint().to_string(), &server.public_key_hex()).unwrap();
    let worker = bootstrap::open_worker(&dir).unwrap();
    let handle = worker.handle();
    let thread = std::thread::spawn(move || worker.run());

    let deadline = tokio::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    while handle.state() != ConnectionState::Waiting {
        assert!(tokio::time::Instant::now() < deadline, "worker never reached Waiting");
        if let Some(RouterEvent::HandshakeSucceeded { routing_id, .. }) = next_router_event(&mut router).await {
            router.try_send(&OutboundFrame::new(routing_id, wire::hello("server", "test").unwrap())).unwrap();
        }
    }

    handle.stop();

    let mut kinds = Vec::new();
    loop {
        assert!(tokio::time::Instant::now() < deadline, "worker never disconnected");
        match next_router_event(&mut router).await {
            Some(RouterEvent::Message { bytes, .. }) => kinds.push(wire::decode(&bytes).unwrap().kind),
            Some(RouterEvent::Disconnected { .. }) => break,
            _ => {}
        }
    }
    thread.join().unwrap().unwrap();

    assert_eq!(kinds.last().map(String::as_str), Some("goodbye"));
}
