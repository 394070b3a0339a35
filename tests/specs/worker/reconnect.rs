//! Worker connection specs
//!
//! Verify the worker follows the server going away and stops cleanly from
//! any state.

use crate::prelude::*;

#[test]
#[serial]
fn server_shutdown_sends_worker_back_to_connecting() {
    let mut server = ServerFixture::new();
    let mut worker = WorkerFixture::prepare(&server, &[]);
    server.start();
    worker.launch(&server);
    assert!(worker.wait_for_state(ConnectionState::Waiting));

    server.stop().unwrap();

    assert!(worker.wait_for_state(ConnectionState::Connecting));
    worker.stop().unwrap();
}

#[test]
#[serial]
fn worker_reconnects_when_the_server_returns() {
    let mut server = ServerFixture::new();
    let mut worker = WorkerFixture::prepare(&server, &[]);
    server.start();
    worker.launch(&server);
    assert!(worker.wait_for_state(ConnectionState::Waiting));

    // Restart on the same port
    let endpoint = server.endpoint();
    server.stop().unwrap();
    assert!(worker.wait_for_state(ConnectionState::Connecting));
    Config::update(&server.dir, |c| c.server.endpoint = endpoint.to_string()).unwrap();
    server.start();

    assert!(worker.wait_for_state(ConnectionState::Waiting));
    worker.stop().unwrap();
}

#[test]
#[serial]
fn worker_stops_while_the_server_is_unreachable() {
    let mut server = ServerFixture::new();
    let worker = WorkerFixture::prepare(&server, &[]);
    server.start();
    let endpoint = server.endpoint();
    server.stop().unwrap();

    bootstrap::add_server(&worker.dir, &endpoint.to_string(), &server.public_key).unwrap();
    let run = bootstrap::open_worker(&worker.dir).unwrap();
    let handle = run.handle();
    let thread = std::thread::spawn(move || run.run());
    assert!(wait_for(SPEC_WAIT_MAX_MS, || handle.state() == ConnectionState::Connecting));

    handle.stop();
    thread.join().unwrap().unwrap();
    assert_eq!(handle.state(), ConnectionState::Stopping);
}
