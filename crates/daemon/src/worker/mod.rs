// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The build worker.
//!
//! Connects out to one server, follows the connection state machine in
//! [`state`] and advances queued builds one step per build tick.

pub mod state;
mod worker_loop;

pub use state::{ConnectionState, StateEvent, Transition};

use std::sync::Arc;

use assemblage_core::{BuilderFactory, StepBuilderFactory, ValidationError};
use assemblage_net::{
    start_polling, AuthError, DealerOptions, DealerSocket, Reactor, SecureChannel, Signal, StopHandle, TransportError,
};
use assemblage_wire::ProtocolError;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use crate::config::WorkerConfig;
use crate::env;
use worker_loop::{Timing, WorkerLoop};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("authentication setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("unhandled message type {0:?}")]
    UnhandledMessageType(String),

    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload { kind: &'static str, reason: String },

    #[error("no remote identity for server {0:?}")]
    UnknownServer(String),

    #[error(transparent)]
    Endpoint(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Worker {
    config: WorkerConfig,
    channel: Arc<SecureChannel>,
    factory: Box<dyn BuilderFactory>,
    stop: StopHandle,
    state: Arc<Mutex<ConnectionState>>,
}

/// Controls a worker from another thread.
#[derive(Clone)]
pub struct WorkerHandle {
    stop: StopHandle,
    state: Arc<Mutex<ConnectionState>>,
}

impl WorkerHandle {
    /// Ask the worker to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }
}

impl Worker {
    /// A worker building with [`StepBuilderFactory`].
    pub fn new(config: WorkerConfig, channel: Arc<SecureChannel>) -> Self {
        Self {
            config,
            channel,
            factory: Box::new(StepBuilderFactory::default()),
            stop: StopHandle::default(),
            state: Arc::default(),
        }
    }

    pub fn with_factory(mut self, factory: Box<dyn BuilderFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle { stop: self.stop.clone(), state: Arc::clone(&self.state) }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Run until stopped or until the server sends something unhandled.
    ///
    /// Blocks the calling thread, which drives its own single-threaded runtime.
    pub fn run(self) -> Result<(), WorkerError> {
        self.channel.check_environment()?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(self.run_loop())
    }

    async fn run_loop(self) -> Result<(), WorkerError> {
        let endpoint = self.config.server_endpoint()?;
        let identity = self.channel.local_identity()?;
        let server = self
            .channel
            .remote_identity(&self.config.server_name)?
            .ok_or_else(|| WorkerError::UnknownServer(self.config.server_name.clone()))?;

        let options = DealerOptions {
            identity,
            server_key: *server.public_key(),
            heartbeat: self.config.heartbeat(),
            reconnect_interval: self.config.reconnect_interval(),
        };
        let socket = DealerSocket::new(endpoint.clone(), options);

        let mut reactor = Reactor::with_stop(self.stop.clone());
        reactor.register_signal_handlers(&Signal::SHUTDOWN)?;

        let timing = Timing { build_tick: self.config.build_tick(), status_interval: self.config.status_interval() };
        let mut worker = WorkerLoop::new(reactor, socket, endpoint.clone(), timing, self.factory, self.state);
        info!(name = %self.config.name, server = %endpoint, "worker started");
        worker.start();

        let result = start_polling(&mut worker).await;
        worker.finish(env::drain_timeout()).await;
        info!(state = %worker.state(), "worker stopped");
        result
    }
}
