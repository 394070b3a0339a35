// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-threaded cooperative event loop.
//!
//! One task owns the reactor and one socket. Each `poll` waits for the first
//! of: a stop request, a registered signal, a periodic timer, or the socket
//! becoming readable (or writable, while write interest is on). Callbacks run
//! between polls, one at a time, and must not block.

use std::fmt;
use std::future::poll_fn;
use std::task::Poll;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::socket::{Readiness, Socket};

/// Handled OS signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Term,
    Hup,
    Int,
}

impl Signal {
    /// The signals that request a graceful stop.
    pub const SHUTDOWN: [Signal; 3] = [Signal::Term, Signal::Hup, Signal::Int];

    fn kind(self) -> SignalKind {
        match self {
            Signal::Term => SignalKind::terminate(),
            Signal::Hup => SignalKind::hangup(),
            Signal::Int => SignalKind::interrupt(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Term => "SIGTERM",
            Signal::Hup => "SIGHUP",
            Signal::Int => "SIGINT",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Thread-safe handle that asks a reactor to stop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Request a stop. Idempotent, callable from any thread.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// What woke the reactor.
#[derive(Debug)]
pub enum Event<E> {
    Socket(E),
    Writable,
    Timer(TimerId),
    Signal(Signal),
    /// Delivered once after [`StopHandle::stop`]
    StopRequested,
}

struct Timer {
    id: TimerId,
    interval: Interval,
}

struct SignalStream {
    signal: Signal,
    stream: tokio::signal::unix::Signal,
}

pub struct Reactor {
    stop: StopHandle,
    stop_delivered: bool,
    stopped: bool,
    write_interest: bool,
    timers: Vec<Timer>,
    next_timer: u64,
    signals: Vec<SignalStream>,
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor {
    pub fn new() -> Self {
        Self::with_stop(StopHandle::default())
    }

    /// A reactor stopped through an existing handle.
    pub fn with_stop(stop: StopHandle) -> Self {
        Self {
            stop,
            stop_delivered: false,
            stopped: false,
            write_interest: false,
            timers: Vec::new(),
            next_timer: 0,
            signals: Vec::new(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn enable_write(&mut self) {
        self.write_interest = true;
    }

    pub fn disable_write(&mut self) {
        self.write_interest = false;
    }

    pub fn write_enabled(&self) -> bool {
        self.write_interest
    }

    /// Make the next `poll` return `None`.
    pub fn stop_polling(&mut self) {
        self.stopped = true;
    }

    pub fn is_polling(&self) -> bool {
        !self.stopped
    }

    /// Fire every `period`, first after one full period.
    ///
    /// Must be called inside a tokio runtime.
    pub fn register_periodic_timer(&mut self, period: Duration) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timers.push(Timer { id, interval });
        debug!(timer = %id, ?period, "timer registered");
        id
    }

    /// Returns false if the timer was already gone.
    pub fn remove_timer(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    pub fn has_timer(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// Route `signals` to this reactor instead of their default action.
    ///
    /// Must be called inside a tokio runtime.
    pub fn register_signal_handlers(&mut self, signals: &[Signal]) -> std::io::Result<()> {
        for &sig in signals {
            if self.signals.iter().any(|s| s.signal == sig) {
                continue;
            }
            let stream = signal(sig.kind())?;
            self.signals.push(SignalStream { signal: sig, stream });
        }
        Ok(())
    }

    /// Wait for the next event.
    ///
    /// `write_to` is the destination of the head of the output queue; it is
    /// only handed to the socket while write interest is enabled. Returns
    /// `None` once [`Reactor::stop_polling`] has been called.
    pub async fn poll<S: Socket>(
        &mut self,
        socket: &mut S,
        write_to: Option<&S::Address>,
    ) -> Option<Event<S::Event>> {
        if self.stopped {
            return None;
        }
        if self.stop.is_stopped() && !self.stop_delivered {
            self.stop_delivered = true;
            return Some(Event::StopRequested);
        }
        let write_to = if self.write_interest { write_to } else { None };
        let stop_pending = !self.stop_delivered;

        tokio::select! {
            biased;
            _ = self.stop.token.cancelled(), if stop_pending => {
                self.stop_delivered = true;
                Some(Event::StopRequested)
            }
            sig = next_signal(&mut self.signals) => Some(Event::Signal(sig)),
            id = next_timer(&mut self.timers) => Some(Event::Timer(id)),
            readiness = socket.ready(write_to) => Some(match readiness {
                Readiness::Event(e) => Event::Socket(e),
                Readiness::Writable => Event::Writable,
            }),
        }
    }
}

async fn next_signal(signals: &mut [SignalStream]) -> Signal {
    poll_fn(|cx| {
        for s in signals.iter_mut() {
            if let Poll::Ready(Some(())) = s.stream.poll_recv(cx) {
                return Poll::Ready(s.signal);
            }
        }
        Poll::Pending
    })
    .await
}

async fn next_timer(timers: &mut [Timer]) -> TimerId {
    poll_fn(|cx| {
        for t in timers.iter_mut() {
            if t.interval.poll_tick(cx).is_ready() {
                return Poll::Ready(t.id);
            }
        }
        Poll::Pending
    })
    .await
}

/// Something that owns a reactor and a socket and reacts to their events.
pub trait Handler {
    type Socket: Socket;
    type Error;

    /// The reactor, the socket, and the head-of-queue destination.
    fn parts(
        &mut self,
    ) -> (&mut Reactor, &mut Self::Socket, Option<&<Self::Socket as Socket>::Address>);

    fn dispatch(&mut self, event: Event<<Self::Socket as Socket>::Event>) -> Result<(), Self::Error>;
}

/// Dispatch events until the handler stops the reactor or fails.
pub async fn start_polling<H: Handler>(handler: &mut H) -> Result<(), H::Error> {
    loop {
        let event = {
            let (reactor, socket, write_to) = handler.parts();
            reactor.poll(socket, write_to).await
        };
        match event {
            Some(event) => handler.dispatch(event)?,
            None => return Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "reactor_tests.rs"]
mod tests;
