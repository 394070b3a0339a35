// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound frame queue.
//!
//! Write interest on the reactor is enabled exactly while the queue holds
//! frames, so an always-writable socket never spins the loop.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, warn};

use crate::reactor::Reactor;
use crate::socket::{Readiness, Socket, TransportError};

/// One encoded message waiting for its peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame<A> {
    pub to: A,
    pub bytes: Vec<u8>,
    /// Close the peer's connection once this frame is handed off
    pub close_after: bool,
}

impl<A> OutboundFrame<A> {
    pub fn new(to: A, bytes: Vec<u8>) -> Self {
        Self { to, bytes, close_after: false }
    }

    pub fn closing(to: A, bytes: Vec<u8>) -> Self {
        Self { to, bytes, close_after: true }
    }
}

/// Result of a single flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    Sent,
    /// Put back at the head of the queue
    Requeued,
    Dropped,
    Empty,
}

/// FIFO of frames bound to one socket.
#[derive(Debug)]
pub struct OutputQueue<A> {
    frames: VecDeque<OutboundFrame<A>>,
}

impl<A> Default for OutputQueue<A> {
    fn default() -> Self {
        Self { frames: VecDeque::new() }
    }
}

impl<A: Clone + std::fmt::Debug> OutputQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Destination of the frame that will be flushed next.
    pub fn front_address(&self) -> Option<&A> {
        self.frames.front().map(|f| &f.to)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutboundFrame<A>> {
        self.frames.iter()
    }

    pub fn enqueue(&mut self, reactor: &mut Reactor, frame: OutboundFrame<A>) {
        self.frames.push_back(frame);
        reactor.enable_write();
    }

    /// Try to send the head frame.
    ///
    /// A would-block puts the frame back at the head; any other transport
    /// error drops it. Write interest is cleared once nothing is left.
    pub fn flush_one<S>(&mut self, reactor: &mut Reactor, socket: &mut S) -> FlushOutcome
    where
        S: Socket<Address = A>,
    {
        let Some(frame) = self.frames.pop_front() else {
            reactor.disable_write();
            return FlushOutcome::Empty;
        };
        let outcome = match socket.try_send(&frame) {
            Ok(()) => FlushOutcome::Sent,
            Err(TransportError::WouldBlock) => {
                self.frames.push_front(frame);
                FlushOutcome::Requeued
            }
            Err(e) => {
                warn!(to = ?frame.to, error = %e, "dropping outbound frame");
                FlushOutcome::Dropped
            }
        };
        if self.frames.is_empty() {
            reactor.disable_write();
        }
        outcome
    }

    /// Flush what can be flushed before `timeout` elapses.
    ///
    /// Used after the loop has stopped; socket events arriving meanwhile are
    /// discarded. Returns the number of frames left behind.
    pub async fn drain<S>(&mut self, reactor: &mut Reactor, socket: &mut S, timeout: Duration) -> usize
    where
        S: Socket<Address = A>,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        while let Some(to) = self.front_address().cloned() {
            match tokio::time::timeout_at(deadline, socket.ready(Some(&to))).await {
                Ok(Readiness::Writable) => {
                    self.flush_one(reactor, socket);
                }
                Ok(Readiness::Event(_)) => debug!("discarding socket event while draining"),
                Err(_) => break,
            }
        }
        if !self.frames.is_empty() {
            warn!(left = self.frames.len(), "output queue not drained");
        }
        self.frames.len()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
