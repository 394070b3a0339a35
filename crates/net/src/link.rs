// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One established, encrypted TCP connection.
//!
//! A link is a writer task fed by a bounded channel and a reader task that
//! forwards decrypted messages. The writer also emits heartbeat pings; the
//! reader gives up on a peer silent for longer than the heartbeat timeout.

use assemblage_wire::{read_frame, write_frame, ProtocolError};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::channel::{open_frame, seal_frame, CipherState, FrameKind, Session};
use crate::socket::Heartbeat;

/// Messages a link can hold before senders see back-pressure
pub(crate) const LINK_BUFFER: usize = 64;

#[derive(Debug)]
pub(crate) enum LinkEvent {
    Message(Vec<u8>),
    Closed(String),
}

/// Handle to a running link. Dropping it closes the connection once the
/// already-queued messages are written, as long as the runtime lives.
pub(crate) struct Link {
    pub(crate) tx: mpsc::Sender<Vec<u8>>,
    reader: JoinHandle<()>,
    writer: Option<JoinHandle<()>>,
}

impl Link {
    pub(crate) fn spawn<K>(
        stream: TcpStream,
        session: Session,
        heartbeat: Heartbeat,
        key: K,
        events: mpsc::UnboundedSender<(K, LinkEvent)>,
    ) -> Self
    where
        K: Clone + Send + 'static,
    {
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::channel(LINK_BUFFER);
        let writer = tokio::spawn(write_loop(write_half, session.sender, rx, heartbeat));
        let reader =
            tokio::spawn(read_loop(read_half, session.receiver, heartbeat, key, events));
        Self { tx, reader, writer: Some(writer) }
    }

    /// Stop reading and return the writer task, which finishes once the
    /// queued messages are written and the stream is shut down.
    pub(crate) fn close(mut self) -> Option<JoinHandle<()>> {
        self.writer.take()
    }
}

/// Wait for closing writers until `deadline`, aborting the ones still running.
pub(crate) async fn join_writers(writers: &mut Vec<JoinHandle<()>>, deadline: Instant) {
    for mut writer in writers.drain(..) {
        if tokio::time::timeout_at(deadline, &mut writer).await.is_err() {
            debug!("link writer still busy at deadline");
            writer.abort();
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut sealer: CipherState,
    mut rx: mpsc::Receiver<Vec<u8>>,
    heartbeat: Heartbeat,
) {
    let mut ping = interval_at(Instant::now() + heartbeat.interval, heartbeat.interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        let (kind, body) = tokio::select! {
            msg = rx.recv() => match msg {
                Some(body) => (FrameKind::Message, body),
                None => break,
            },
            _ = ping.tick() => (FrameKind::Ping, Vec::new()),
        };
        let frame = match seal_frame(&mut sealer, kind, &body) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to seal frame, closing link");
                break;
            }
        };
        if let Err(e) = write_frame(&mut writer, &frame).await {
            debug!(error = %e, "link write failed");
            break;
        }
    }
    let _ = writer.shutdown().await;
}

async fn read_loop<K>(
    mut reader: OwnedReadHalf,
    mut opener: CipherState,
    heartbeat: Heartbeat,
    key: K,
    events: mpsc::UnboundedSender<(K, LinkEvent)>,
) where
    K: Clone + Send + 'static,
{
    let reason = loop {
        let frame = match tokio::time::timeout(heartbeat.timeout, read_frame(&mut reader)).await {
            Err(_) => break "heartbeat timeout".to_string(),
            Ok(Err(ProtocolError::ConnectionClosed)) => break "connection closed".to_string(),
            Ok(Err(e)) => break e.to_string(),
            Ok(Ok(frame)) => frame,
        };
        match open_frame(&mut opener, &frame) {
            Ok((FrameKind::Message, body)) => {
                if events.send((key.clone(), LinkEvent::Message(body))).is_err() {
                    return;
                }
            }
            Ok((FrameKind::Ping, _)) => {}
            Ok((FrameKind::Ready, _)) => break "unexpected handshake frame".to_string(),
            Err(e) => break e.to_string(),
        }
    };
    let _ = events.send((key, LinkEvent::Closed(reason)));
}
