//! Shared fixtures: a real server in its own thread, and raw peers that
//! talk to it over loopback.

#![allow(dead_code, unused_imports)]

use std::path::PathBuf;
pub use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub use assemblage_core::{AssemblyId, ClientKind, Metastore};
pub use assemblage_daemon::bootstrap;
pub use assemblage_daemon::{Config, ConnectionState, Role, ServerError, ServerHandle, WorkerError, WorkerHandle};
pub use assemblage_net::{
    parse_public_key, DealerEvent, DealerOptions, DealerSocket, Endpoint, Heartbeat, Identity, OutboundFrame,
    Readiness, Socket, TransportError,
};
pub use assemblage_storage::Store;
pub use assemblage_wire::{self as wire, Header, Message};
pub use serde_json::{json, Value};
pub use serial_test::serial;
pub use tempfile::TempDir;

/// Upper bound for anything a spec waits on
pub const SPEC_WAIT_MAX_MS: u64 = 5_000;

const SPEC_WAIT: Duration = Duration::from_millis(SPEC_WAIT_MAX_MS);

/// Poll `condition` every 10ms until it holds or `max_ms` passes.
pub fn wait_for(max_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// A server run directory, and the server once started.
pub struct ServerFixture {
    pub root: TempDir,
    pub dir: PathBuf,
    pub public_key: String,
    pub handle: Option<ServerHandle>,
    thread: Option<JoinHandle<Result<(), ServerError>>>,
}

impl ServerFixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("server");
        bootstrap::setup_run_directory(&dir, Role::Server).unwrap();
        let public_key = bootstrap::generate_cert(&dir, Role::Server).unwrap();
        bootstrap::create_database(&dir).unwrap();
        Self { root, dir, public_key, handle: None, thread: None }
    }

    /// A started server with no clients.
    pub fn running() -> Self {
        let mut server = Self::new();
        server.start();
        server
    }

    pub fn start(&mut self) {
        let server = bootstrap::open_server(&self.dir).unwrap();
        let handle = server.handle();
        self.thread = Some(std::thread::spawn(move || server.start()));
        assert!(wait_for(SPEC_WAIT_MAX_MS, || handle.is_running()), "server did not start");
        self.handle = Some(handle);
    }

    pub fn handle(&self) -> &ServerHandle {
        self.handle.as_ref().expect("server not started")
    }

    pub fn endpoint(&self) -> Endpoint {
        self.handle().endpoint().expect("server not running")
    }

    /// Register a client and return an identity that can log in as it.
    pub fn register(&self, kind: ClientKind, name: &str) -> Arc<Identity> {
        let identity = Identity::generate(name);
        match kind {
            ClientKind::Worker => {
                bootstrap::add_worker(&self.dir, name, &identity.public_key_hex(), &[]).unwrap();
            }
            ClientKind::Repository => {
                bootstrap::add_repository(&self.dir, name, &identity.public_key_hex()).unwrap();
            }
        }
        Arc::new(identity)
    }

    /// The metastore as last persisted by the server.
    pub fn metastore(&self) -> Store {
        let config = Config::load(&self.dir).unwrap();
        Store::open(config.db.path.unwrap()).unwrap()
    }

    /// Stop the server and wait for its thread.
    pub fn stop(&mut self) -> Result<(), ServerError> {
        if let Some(handle) = &self.handle {
            handle.stop();
        }
        self.join()
    }

    /// Wait for the server thread to exit on its own.
    pub fn join(&mut self) -> Result<(), ServerError> {
        match self.thread.take() {
            Some(thread) => thread.join().unwrap(),
            None => Ok(()),
        }
    }
}

impl Drop for ServerFixture {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.stop();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// A worker run directory registered with a server, and the worker once launched.
pub struct WorkerFixture {
    pub dir: PathBuf,
    pub handle: Option<WorkerHandle>,
    thread: Option<JoinHandle<Result<(), WorkerError>>>,
}

impl WorkerFixture {
    /// Set up a worker and register it with `server`.
    pub fn prepare(server: &ServerFixture, tags: &[String]) -> Self {
        let dir = server.root.path().join("worker");
        bootstrap::setup_run_directory(&dir, Role::Worker).unwrap();
        let key = bootstrap::generate_cert(&dir, Role::Worker).unwrap();
        let config = Config::update(&dir, |c| {
            c.worker.build_tick_ms = 10;
            c.worker.status_interval_ms = 50;
            c.worker.reconnect_interval_ms = 50;
        })
        .unwrap();
        bootstrap::add_worker(&server.dir, &config.worker.name, &key, tags).unwrap();
        Self { dir, handle: None, thread: None }
    }

    /// Point the worker at the running `server` and start it.
    pub fn launch(&mut self, server: &ServerFixture) {
        bootstrap::add_server(&self.dir, &server.endpoint().to_string(), &server.public_key).unwrap();
        let worker = bootstrap::open_worker(&self.dir).unwrap();
        self.handle = Some(worker.handle());
        self.thread = Some(std::thread::spawn(move || worker.run()));
    }

    pub fn state(&self) -> ConnectionState {
        self.handle.as_ref().map(WorkerHandle::state).unwrap_or_default()
    }

    pub fn wait_for_state(&self, state: ConnectionState) -> bool {
        wait_for(SPEC_WAIT_MAX_MS, || self.state() == state)
    }

    pub fn stop(&mut self) -> Result<(), WorkerError> {
        if let Some(handle) = &self.handle {
            handle.stop();
        }
        match self.thread.take() {
            Some(thread) => thread.join().unwrap(),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerFixture {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.stop();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// A raw client connection speaking the wire protocol by hand.
pub struct Peer {
    socket: DealerSocket,
}

impl Peer {
    fn socket(server: &ServerFixture, identity: Arc<Identity>) -> DealerSocket {
        DealerSocket::new(
            server.endpoint(),
            DealerOptions {
                identity,
                server_key: parse_public_key(&server.public_key).unwrap(),
                heartbeat: Heartbeat::default(),
                reconnect_interval: Duration::from_millis(50),
            },
        )
    }

    pub async fn connect(server: &ServerFixture, identity: Arc<Identity>) -> Self {
        let mut socket = Self::socket(server, identity);
        match next_event(&mut socket).await {
            DealerEvent::Connected { .. } => Self { socket },
            other => panic!("expected to connect, got {other:?}"),
        }
    }

    /// The reason the first connection attempt fails.
    pub async fn refused(server: &ServerFixture, identity: Arc<Identity>) -> String {
        let mut socket = Self::socket(server, identity);
        match next_event(&mut socket).await {
            DealerEvent::ConnectFailed { reason } => reason,
            other => panic!("expected to be refused, got {other:?}"),
        }
    }

    pub async fn send(&mut self, bytes: Vec<u8>) {
        let frame = OutboundFrame::new((), bytes);
        loop {
            match self.socket.try_send(&frame) {
                Ok(()) => return,
                Err(TransportError::WouldBlock) => {
                    let _ = tokio::time::timeout(SPEC_WAIT, self.socket.ready(Some(&()))).await;
                }
                Err(e) => panic!("send failed: {e}"),
            }
        }
    }

    pub async fn command(&mut self, kind: &str, payload: Value) {
        self.send(wire::encode(kind, &payload, Header::new()).unwrap()).await;
    }

    pub async fn recv(&mut self) -> Message {
        match next_event(&mut self.socket).await {
            DealerEvent::Message(bytes) => wire::decode(&bytes).unwrap(),
            other => panic!("expected a message, got {other:?}"),
        }
    }

    /// Skip messages until one of type `kind` arrives.
    pub async fn recv_kind(&mut self, kind: &str) -> Message {
        loop {
            let message = self.recv().await;
            if message.kind == kind {
                return message;
            }
        }
    }
}

async fn next_event(socket: &mut DealerSocket) -> DealerEvent {
    loop {
        match tokio::time::timeout(SPEC_WAIT, socket.ready(None)).await {
            Ok(Readiness::Event(event)) => return event,
            Ok(Readiness::Writable) => {}
            Err(_) => panic!("no socket event within {SPEC_WAIT:?}"),
        }
    }
}
