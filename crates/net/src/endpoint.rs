// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tcp://host:port` endpoints.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use assemblage_core::ValidationError;

const SCHEME: &str = "tcp://";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, as accepted by tokio's bind and connect.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        let host = match addr {
            SocketAddr::V4(v4) => v4.ip().to_string(),
            SocketAddr::V6(v6) => format!("[{}]", v6.ip()),
        };
        Self { host, port: addr.port() }
    }
}

impl FromStr for Endpoint {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidEndpoint(s.to_string());
        let rest = s.strip_prefix(SCHEME).ok_or_else(invalid)?;
        let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() || host.contains('/') {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(Self { host: host.to_string(), port })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        loopback = { "tcp://127.0.0.1:5555", "127.0.0.1", 5555 },
        ephemeral = { "tcp://127.0.0.1:0", "127.0.0.1", 0 },
        hostname = { "tcp://build.example.com:9000", "build.example.com", 9000 },
        ipv6 = { "tcp://[::1]:7000", "[::1]", 7000 },
    )]
    fn parses(text: &str, host: &str, port: u16) {
        let endpoint: Endpoint = text.parse().unwrap();
        assert_eq!(endpoint.host(), host);
        assert_eq!(endpoint.port(), port);
        assert_eq!(endpoint.to_string(), text);
    }

    #[parameterized(
        no_scheme = { "127.0.0.1:5555" },
        wrong_scheme = { "udp://127.0.0.1:5555" },
        no_port = { "tcp://127.0.0.1" },
        bad_port = { "tcp://127.0.0.1:99999" },
        empty_host = { "tcp://:5555" },
        path = { "tcp://host/x:1" },
    )]
    fn rejects(text: &str) {
        assert_eq!(text.parse::<Endpoint>(), Err(ValidationError::InvalidEndpoint(text.to_string())));
    }

    #[test]
    fn from_socket_addr() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(Endpoint::from(addr).to_string(), "tcp://127.0.0.1:4000");
    }
}
