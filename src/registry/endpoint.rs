//! Endpoint definitions
//!
//! An endpoint is one server reachable over one transport kind.

use std::fmt;

use crate::error::{ClientError, Result};

/// Default TCP / UDP / SCTP port of the server
pub const DEFAULT_PORT: u16 = 26010;

/// Default TIPC name instance of the server
pub const DEFAULT_TIPC_INSTANCE: u32 = 10;

/// TIPC service type the server binds its name sequence to
pub const TIPC_SERVICE_TYPE: u32 = 26001;

/// Transport kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransportKind {
    Tcp,
    Udp,
    Tipc,
    Sctp,
}

impl TransportKind {
    /// True for kinds addressed by host + port
    pub fn is_ip(&self) -> bool {
        !matches!(self, TransportKind::Tipc)
    }

    /// True for kinds that keep a connection open
    pub fn is_connection_oriented(&self) -> bool {
        matches!(self, TransportKind::Tcp | TransportKind::Sctp)
    }

    /// True if each message on the wire carries a length prefix
    pub fn is_stream(&self) -> bool {
        matches!(self, TransportKind::Tcp)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Udp => "udp",
            TransportKind::Tipc => "tipc",
            TransportKind::Sctp => "sctp",
        };
        f.write_str(name)
    }
}

/// A (transport kind, host, port) triple identifying one server
///
/// For TIPC the host is empty and `port` is the TIPC name instance, since
/// TIPC addressing is cluster-local.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    kind: TransportKind,
    host: String,
    port: u32,
}

impl Endpoint {
    /// TCP endpoint
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::ip(TransportKind::Tcp, host, port)
    }

    /// UDP endpoint
    pub fn udp(host: impl Into<String>, port: u16) -> Self {
        Self::ip(TransportKind::Udp, host, port)
    }

    /// SCTP endpoint
    pub fn sctp(host: impl Into<String>, port: u16) -> Self {
        Self::ip(TransportKind::Sctp, host, port)
    }

    /// TIPC endpoint (cluster scope, name instance `port`)
    pub fn tipc(port: u32) -> Self {
        Self {
            kind: TransportKind::Tipc,
            host: String::new(),
            port,
        }
    }

    fn ip(kind: TransportKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            host: host.into(),
            port: u32::from(port),
        }
    }

    /// Transport kind
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Host name or address (empty for TIPC)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port (TIPC: name instance)
    pub fn port(&self) -> u32 {
        self.port
    }

    /// `host:port` form used for socket address resolution
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Check the addressing parameters
    pub fn validate(&self) -> Result<()> {
        if !self.kind.is_ip() {
            return Ok(());
        }

        if self.host.trim().is_empty() {
            return Err(ClientError::Config(format!(
                "{} endpoint requires a host",
                self.kind
            )));
        }

        if self.port == 0 || self.port > u32::from(u16::MAX) {
            return Err(ClientError::Config(format!(
                "{} endpoint {}: port {} out of range",
                self.kind, self.host, self.port
            )));
        }

        Ok(())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_ip() {
            write!(f, "{}://{}", self.kind, self.socket_addr())
        } else {
            write!(f, "tipc://{{{}, {}}}", TIPC_SERVICE_TYPE, self.port)
        }
    }
}
