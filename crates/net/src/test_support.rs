// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory socket for exercising reactor clients without a network.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::queue::OutboundFrame;
use crate::socket::{Connector, Readiness, Socket, TransportError};

/// Scripted result of one `try_send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBehavior {
    Accept,
    WouldBlock,
    Fail,
}

/// Socket that replays queued events and records accepted frames.
///
/// `ready` yields queued events first, then `Writable` when asked, and
/// otherwise never resolves.
pub struct FakeSocket<A, E> {
    pub incoming: VecDeque<E>,
    pub sent: Vec<OutboundFrame<A>>,
    pub script: VecDeque<SendBehavior>,
    pub attempts: usize,
    pub reconnects: usize,
    pub closed: bool,
    pub shut_down: bool,
}

impl<A, E> Default for FakeSocket<A, E> {
    fn default() -> Self {
        Self {
            incoming: VecDeque::new(),
            sent: Vec::new(),
            script: VecDeque::new(),
            attempts: 0,
            reconnects: 0,
            closed: false,
            shut_down: false,
        }
    }
}

impl<A, E> FakeSocket<A, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_event(&mut self, event: E) {
        self.incoming.push_back(event);
    }

    /// Script the next `try_send` results; unscripted sends are accepted.
    pub fn script(&mut self, behaviors: impl IntoIterator<Item = SendBehavior>) {
        self.script.extend(behaviors);
    }

    pub fn take_sent(&mut self) -> Vec<OutboundFrame<A>> {
        std::mem::take(&mut self.sent)
    }
}

#[async_trait]
impl<A, E> Socket for FakeSocket<A, E>
where
    A: Clone + fmt::Debug + Send + Sync,
    E: Send,
{
    type Address = A;
    type Event = E;

    async fn ready(&mut self, write_to: Option<&A>) -> Readiness<E> {
        if let Some(event) = self.incoming.pop_front() {
            return Readiness::Event(event);
        }
        if write_to.is_some() {
            return Readiness::Writable;
        }
        std::future::pending().await
    }

    fn try_send(&mut self, frame: &OutboundFrame<A>) -> Result<(), TransportError> {
        self.attempts += 1;
        match self.script.pop_front().unwrap_or(SendBehavior::Accept) {
            SendBehavior::Accept => {
                self.sent.push(frame.clone());
                Ok(())
            }
            SendBehavior::WouldBlock => Err(TransportError::WouldBlock),
            SendBehavior::Fail => Err(TransportError::Closed),
        }
    }

    async fn shutdown(&mut self, _timeout: Duration) {
        self.closed = true;
        self.shut_down = true;
    }
}

impl<A, E> Connector for FakeSocket<A, E>
where
    A: Clone + fmt::Debug + Send + Sync,
    E: Send,
{
    fn reconnect(&mut self) {
        self.reconnects += 1;
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
