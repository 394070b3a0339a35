// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The build server.
//!
//! Binds one authenticated endpoint, tracks clients by routing id and answers
//! their commands from a single-threaded reactor.

mod commands;
mod dispatch;
mod session;

pub use commands::{CommandError, RUNNING_STATE};
pub use session::ClientSession;

use std::sync::Arc;
use std::time::Instant;

use assemblage_core::{Metastore, ValidationError};
use assemblage_net::{
    start_polling, AuthError, Endpoint, Reactor, RouterOptions, RouterSocket, SecureChannel, Signal, StopHandle,
    TransportError,
};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use crate::config::ServerConfig;
use crate::env;
use dispatch::Dispatcher;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("authentication setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Endpoint(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default)]
struct Running {
    start_time: Option<Instant>,
    endpoint: Option<Endpoint>,
}

pub struct Server {
    config: ServerConfig,
    channel: Arc<SecureChannel>,
    metastore: Arc<dyn Metastore>,
    stop: StopHandle,
    running: Arc<Mutex<Running>>,
}

/// Controls a server from another thread.
#[derive(Clone)]
pub struct ServerHandle {
    stop: StopHandle,
    running: Arc<Mutex<Running>>,
}

impl ServerHandle {
    /// Ask the server to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().start_time.is_some()
    }

    /// The bound endpoint while running.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.running.lock().endpoint.clone()
    }
}

impl Server {
    pub fn new(config: ServerConfig, channel: Arc<SecureChannel>, metastore: Arc<dyn Metastore>) -> Self {
        Self { config, channel, metastore, stop: StopHandle::default(), running: Arc::default() }
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle { stop: self.stop.clone(), running: Arc::clone(&self.running) }
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().start_time.is_some()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Run until stopped by [`Server::stop`] or a TERM, HUP or INT signal.
    ///
    /// Blocks the calling thread, which drives its own single-threaded runtime.
    pub fn start(&self) -> Result<(), ServerError> {
        self.channel.check_environment()?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let result = runtime.block_on(self.run());
        *self.running.lock() = Running::default();
        result
    }

    async fn run(&self) -> Result<(), ServerError> {
        let options = RouterOptions {
            identity: self.channel.local_identity()?,
            authenticator: self.channel.authenticator()?,
            heartbeat: self.config.heartbeat(),
        };
        let socket = RouterSocket::bind(&self.config.endpoint()?, options).await?;
        let endpoint = socket.endpoint().clone();

        let mut reactor = Reactor::with_stop(self.stop.clone());
        reactor.register_signal_handlers(&Signal::SHUTDOWN)?;

        let start_time = Instant::now();
        *self.running.lock() = Running { start_time: Some(start_time), endpoint: Some(endpoint.clone()) };
        info!(%endpoint, "server started");

        let mut dispatcher = Dispatcher::new(reactor, socket, Arc::clone(&self.metastore), start_time);
        let result = start_polling(&mut dispatcher).await;
        dispatcher.drain(env::drain_timeout()).await;
        info!(%endpoint, "server stopped");
        result
    }
}
