// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Networking substrate shared by the server and the worker.
//!
//! - [`Reactor`]: single-threaded event loop over one socket, timers and signals
//! - [`OutputQueue`]: FIFO of outbound frames with write-interest bookkeeping
//! - [`SecureChannel`]: identities, the authenticator, and the encrypted handshake
//! - [`RouterSocket`] / [`DealerSocket`]: the listening and connecting transports

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod channel;
mod dealer;
mod endpoint;
mod link;
mod observer;
mod queue;
mod reactor;
mod router;
mod socket;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use channel::{
    parse_public_key, AuthConfig, AuthError, Authenticator, HandshakeError, Identity, SecureChannel,
    AUTH_DOMAIN,
};
pub use dealer::{DealerEvent, DealerOptions, DealerSocket};
pub use endpoint::Endpoint;
pub use observer::{ConnectionObserver, PeerInfo};
pub use queue::{FlushOutcome, OutboundFrame, OutputQueue};
pub use reactor::{start_polling, Event, Handler, Reactor, Signal, StopHandle, TimerId};
pub use router::{RouterEvent, RouterOptions, RouterSocket, RoutingId};
pub use socket::{Connector, Heartbeat, Readiness, Socket, TransportError};
