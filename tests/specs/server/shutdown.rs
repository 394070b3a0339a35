//! Server shutdown specs
//!
//! Verify the server stops cleanly on request and on TERM, HUP or INT, and
//! tells connected clients to disconnect first.

use crate::prelude::*;
use nix::sys::signal::{raise, Signal as Sig};

fn stops_on(signal: Sig) {
    let mut server = ServerFixture::running();
    let handle = server.handle().clone();

    raise(signal).unwrap();

    assert!(wait_for(SPEC_WAIT_MAX_MS, || !handle.is_running()), "server ignored {signal:?}");
    server.join().unwrap();
}

#[test]
#[serial]
fn stops_on_term() {
    stops_on(Sig::SIGTERM);
}

#[test]
#[serial]
fn stops_on_hup() {
    stops_on(Sig::SIGHUP);
}

#[test]
#[serial]
fn stops_on_int() {
    stops_on(Sig::SIGINT);
}

#[test]
#[serial]
fn stop_is_idempotent() {
    let mut server = ServerFixture::running();
    let handle = server.handle().clone();

    handle.stop();
    handle.stop();

    server.join().unwrap();
    assert!(!handle.is_running());
    assert!(handle.endpoint().is_none());
}

#[tokio::test]
#[serial]
async fn stop_sends_control_disconnect_to_clients() {
    let mut server = ServerFixture::new();
    let identity = server.register(ClientKind::Repository, "webapp");
    server.start();

    let mut peer = Peer::connect(&server, identity).await;
    peer.command("status", json!([])).await;
    peer.recv_kind("status").await;

    server.handle().stop();
    let control = peer.recv_kind("control").await;

    assert_eq!(control.payload, json!(["disconnect"]));
    server.join().unwrap();
}
