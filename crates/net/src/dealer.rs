// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connecting socket for the worker.
//!
//! Connects lazily on the first poll and reconnects after a fixed interval
//! whenever the link is lost. Frames queued while disconnected wait in the
//! caller's output queue and are encrypted for whichever link carries them.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::debug;
use x25519_dalek::PublicKey;

use crate::channel::{client_handshake, HandshakeError, Identity, Session};
use crate::endpoint::Endpoint;
use crate::link::{join_writers, Link, LinkEvent};
use crate::queue::OutboundFrame;
use crate::router::HANDSHAKE_TIMEOUT;
use crate::socket::{Connector, Heartbeat, Readiness, Socket, TransportError};

#[derive(Debug, Clone)]
pub struct DealerOptions {
    pub identity: Arc<Identity>,
    /// Static key the server must prove it holds
    pub server_key: PublicKey,
    pub heartbeat: Heartbeat,
    pub reconnect_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DealerEvent {
    Connected { server_name: String },
    ConnectFailed { reason: String },
    Message(Vec<u8>),
    Disconnected { reason: String },
}

type ConnectTask = JoinHandle<Result<(TcpStream, Session), TransportError>>;

enum Wake {
    Connect(Result<Result<(TcpStream, Session), TransportError>, JoinError>),
    Link(u64, LinkEvent),
    Retry,
}

pub struct DealerSocket {
    endpoint: Endpoint,
    options: DealerOptions,
    link: Option<Link>,
    /// Bumped per link so events from a replaced link are ignored
    generation: u64,
    connecting: Option<ConnectTask>,
    retry_at: Option<Instant>,
    pending: VecDeque<DealerEvent>,
    link_tx: mpsc::UnboundedSender<(u64, LinkEvent)>,
    link_events: mpsc::UnboundedReceiver<(u64, LinkEvent)>,
    /// Writers of dropped links still flushing their last frames
    closing: Vec<JoinHandle<()>>,
}

impl DealerSocket {
    /// Create a socket that connects to `endpoint` on first poll.
    pub fn new(endpoint: Endpoint, options: DealerOptions) -> Self {
        let (link_tx, link_events) = mpsc::unbounded_channel();
        Self {
            endpoint,
            options,
            link: None,
            generation: 0,
            connecting: None,
            retry_at: Some(Instant::now()),
            pending: VecDeque::new(),
            link_tx,
            link_events,
            closing: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    fn drop_link(&mut self) {
        if let Some(link) = self.link.take() {
            debug!(endpoint = %self.endpoint, "link dropped");
            self.closing.retain(|writer| !writer.is_finished());
            self.closing.extend(link.close());
        }
        self.generation += 1;
    }

    fn start_connect(&mut self) {
        let address = self.endpoint.address();
        let identity = Arc::clone(&self.options.identity);
        let server_key = self.options.server_key;
        debug!(endpoint = %self.endpoint, "connecting");
        self.connecting = Some(tokio::spawn(async move {
            let mut stream = TcpStream::connect(address).await?;
            stream.set_nodelay(true)?;
            let session =
                tokio::time::timeout(HANDSHAKE_TIMEOUT, client_handshake(&mut stream, &identity, &server_key))
                    .await
                    .map_err(|_| HandshakeError::Timeout)??;
            Ok::<_, TransportError>((stream, session))
        }));
    }

    fn schedule_retry(&mut self) {
        self.retry_at = Some(Instant::now() + self.options.reconnect_interval);
    }

    fn handle(&mut self, wake: Wake) -> Option<DealerEvent> {
        match wake {
            Wake::Retry => {
                self.retry_at = None;
                self.start_connect();
                None
            }
            Wake::Connect(joined) => {
                self.connecting = None;
                match joined {
                    Ok(Ok((stream, session))) => {
                        self.generation += 1;
                        let server_name = session.peer_name.clone();
                        self.link = Some(Link::spawn(
                            stream,
                            session,
                            self.options.heartbeat,
                            self.generation,
                            self.link_tx.clone(),
                        ));
                        Some(DealerEvent::Connected { server_name })
                    }
                    Ok(Err(e)) => {
                        self.schedule_retry();
                        Some(DealerEvent::ConnectFailed { reason: e.to_string() })
                    }
                    Err(e) => {
                        self.schedule_retry();
                        Some(DealerEvent::ConnectFailed { reason: e.to_string() })
                    }
                }
            }
            Wake::Link(generation, _) if generation != self.generation => None,
            Wake::Link(_, LinkEvent::Message(bytes)) => Some(DealerEvent::Message(bytes)),
            Wake::Link(_, LinkEvent::Closed(reason)) => {
                self.link = None;
                self.generation += 1;
                self.schedule_retry();
                Some(DealerEvent::Disconnected { reason })
            }
        }
    }
}

async fn join_connect(task: &mut Option<ConnectTask>) -> Result<Result<(TcpStream, Session), TransportError>, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn retry_due(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn link_writable(link: Option<&Link>) {
    match link {
        // An error means the link is gone; try_send reports that
        Some(link) => drop(link.tx.reserve().await),
        None => std::future::pending().await,
    }
}

#[async_trait]
impl Socket for DealerSocket {
    type Address = ();
    type Event = DealerEvent;

    async fn ready(&mut self, write_to: Option<&()>) -> Readiness<DealerEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Readiness::Event(event);
            }
            let idle = self.link.is_none() && self.connecting.is_none();
            let wake = tokio::select! {
                joined = join_connect(&mut self.connecting) => Wake::Connect(joined),
                Some((generation, event)) = self.link_events.recv() => Wake::Link(generation, event),
                () = retry_due(self.retry_at), if idle => Wake::Retry,
                () = link_writable(self.link.as_ref()), if write_to.is_some() => {
                    return Readiness::Writable;
                }
            };
            if let Some(event) = self.handle(wake) {
                return Readiness::Event(event);
            }
        }
    }

    fn try_send(&mut self, frame: &OutboundFrame<()>) -> Result<(), TransportError> {
        let Some(link) = &self.link else {
            return Err(TransportError::WouldBlock);
        };
        match link.tx.try_send(frame.bytes.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(TransportError::WouldBlock),
            Err(TrySendError::Closed(_)) => {
                // The writer died; hold the frame for the next link
                self.drop_link();
                self.schedule_retry();
                self.pending.push_back(DealerEvent::Disconnected { reason: "link closed".to_string() });
                return Err(TransportError::WouldBlock);
            }
        }
        if frame.close_after {
            self.reconnect();
        }
        Ok(())
    }

    async fn shutdown(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        self.close();
        join_writers(&mut self.closing, deadline).await;
    }
}

impl Connector for DealerSocket {
    fn reconnect(&mut self) {
        self.drop_link();
        if self.connecting.is_none() {
            self.schedule_retry();
        }
    }

    fn close(&mut self) {
        self.drop_link();
        if let Some(task) = self.connecting.take() {
            task.abort();
        }
        self.retry_at = None;
    }
}
