//! Socket Transport
//!
//! TCP and UDP round trips over `std::net`.
//!
//! ## Connections
//! - One connection (TCP) or connected socket (UDP) per endpoint
//! - Established at registration when possible, otherwise on first use
//! - A connection is used by one request at a time (per-endpoint mutex)
//! - A TCP connection that failed mid-exchange is dropped; the next call
//!   opens a new one
//!
//! TIPC and SCTP have no sockets in the standard library, so this transport
//! reports them as unsupported.

use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::protocol::{
    decode_reply, encode_request, read_reply, write_request, Reply, Request, MAX_DATAGRAM_SIZE,
    REQUEST_HEADER_SIZE,
};
use crate::registry::{Endpoint, TransportKind};
use super::Transport;

/// Room for sizes and header fields on top of the key/value payload
const FRAME_OVERHEAD: usize = REQUEST_HEADER_SIZE + 16;

/// Used for connect when no write timeout is configured
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One open connection to an endpoint
enum Connection {
    Tcp {
        /// TCP stream reader (buffered for efficiency)
        reader: BufReader<TcpStream>,

        /// TCP stream writer (buffered for efficiency)
        writer: BufWriter<TcpStream>,
    },
    Udp(UdpSocket),
}

/// Per-endpoint connection slot; `None` until (re)connected
type Slot = Arc<Mutex<Option<Connection>>>;

/// TCP/UDP transport
pub struct SocketTransport {
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    max_payload_size: usize,
    max_message_size: usize,
    connections: Mutex<HashMap<Endpoint, Slot>>,
}

impl SocketTransport {
    /// Create a transport using the timeouts and size limit of `config`
    pub fn new(config: &Config) -> Self {
        Self {
            read_timeout: millis(config.read_timeout_ms),
            write_timeout: millis(config.write_timeout_ms),
            max_payload_size: config.max_payload_size,
            max_message_size: config.max_payload_size + FRAME_OVERHEAD,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Number of endpoints with an open connection
    pub fn open_connections(&self) -> usize {
        self.connections
            .lock()
            .values()
            .filter(|slot| slot.lock().is_some())
            .count()
    }

    fn slot(&self, endpoint: &Endpoint) -> Slot {
        let mut connections = self.connections.lock();
        Arc::clone(connections.entry(endpoint.clone()).or_default())
    }

    /// Resolve the endpoint's socket addresses
    fn resolve(endpoint: &Endpoint) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = endpoint
            .socket_addr()
            .to_socket_addrs()
            .map_err(|e| {
                ClientError::Config(format!("cannot resolve {}: {}", endpoint, e))
            })?
            .collect();

        if addrs.is_empty() {
            return Err(ClientError::Config(format!(
                "{} resolved to no address",
                endpoint
            )));
        }
        Ok(addrs)
    }

    fn connect(&self, endpoint: &Endpoint) -> Result<Connection> {
        let addrs = Self::resolve(endpoint)?;

        match endpoint.kind() {
            TransportKind::Tcp => self.connect_tcp(&addrs),
            TransportKind::Udp => self.connect_udp(&addrs),
            other => Err(ClientError::Config(format!(
                "unsupported transport kind: {}",
                other
            ))),
        }
    }

    fn connect_tcp(&self, addrs: &[SocketAddr]) -> Result<Connection> {
        let connect_timeout = self.write_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(stream) => {
                    // Requests are small, don't let Nagle hold them back
                    stream.set_nodelay(true)?;
                    stream.set_read_timeout(self.read_timeout)?;
                    stream.set_write_timeout(self.write_timeout)?;

                    let read_stream = stream.try_clone()?;
                    return Ok(Connection::Tcp {
                        reader: BufReader::new(read_stream),
                        writer: BufWriter::new(stream),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(ClientError::Io(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "no address to connect to")
        })))
    }

    fn connect_udp(&self, addrs: &[SocketAddr]) -> Result<Connection> {
        let target = addrs[0];
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(local)?;
        socket.connect(target)?;
        socket.set_read_timeout(self.read_timeout)?;
        socket.set_write_timeout(self.write_timeout)?;
        Ok(Connection::Udp(socket))
    }

    fn exchange(&self, connection: &mut Connection, request: &Request) -> Result<Reply> {
        tracing::trace!(
            "Sending request id {} ({:?}, {} payload bytes)",
            request.id,
            request.command.command_type(),
            request.command.payload_len()
        );

        match connection {
            Connection::Tcp { reader, writer } => {
                write_request(writer, request)?;
                read_reply(reader, self.max_message_size)
            }
            Connection::Udp(socket) => {
                let message = encode_request(request);
                if message.len() > MAX_DATAGRAM_SIZE {
                    return Err(ClientError::Protocol(format!(
                        "Request of {} bytes does not fit a datagram",
                        message.len()
                    )));
                }
                socket.send(&message)?;

                let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
                loop {
                    let n = socket.recv(&mut buf)?;
                    let reply = decode_reply(&buf[..n])?;
                    if reply.id == request.id {
                        return Ok(reply);
                    }
                    // Late answer to an earlier request that timed out
                    tracing::trace!("Discarding stale reply id {}", reply.id);
                }
            }
        }
    }
}

impl Default for SocketTransport {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Transport for SocketTransport {
    fn supports(&self, kind: TransportKind) -> bool {
        matches!(kind, TransportKind::Tcp | TransportKind::Udp)
    }

    fn prepare(&self, endpoint: &Endpoint) -> Result<()> {
        if !self.supports(endpoint.kind()) {
            return Err(ClientError::Config(format!(
                "unsupported transport kind: {}",
                endpoint.kind()
            )));
        }

        // Unresolvable hosts are a configuration error
        Self::resolve(endpoint)?;

        let slot = self.slot(endpoint);
        let mut connection = slot.lock();
        if connection.is_none() {
            match self.connect(endpoint) {
                Ok(conn) => *connection = Some(conn),
                Err(e) => {
                    tracing::warn!("{} not reachable yet ({}), will connect on first use", endpoint, e);
                }
            }
        }
        Ok(())
    }

    fn round_trip(&self, endpoint: &Endpoint, request: &Request) -> Result<Reply> {
        let payload_len = request.command.payload_len();
        if payload_len > self.max_payload_size {
            return Err(ClientError::Protocol(format!(
                "Request payload of {} bytes exceeds the limit of {}",
                payload_len, self.max_payload_size
            )));
        }

        let slot = self.slot(endpoint);
        let mut guard = slot.lock();

        if guard.is_none() {
            *guard = Some(self.connect(endpoint)?);
        }

        let connection = match guard.as_mut() {
            Some(connection) => connection,
            None => return Err(ClientError::Protocol("connection slot empty".to_string())),
        };

        let result = self.exchange(connection, request);
        if let Err(ref e) = result {
            if matches!(connection, Connection::Tcp { .. }) {
                // The stream may hold half a frame now
                tracing::warn!("Dropping connection to {}: {}", endpoint, e);
                *guard = None;
            }
        }
        result
    }
}

fn millis(ms: u64) -> Option<Duration> {
    if ms > 0 {
        Some(Duration::from_millis(ms))
    } else {
        None
    }
}
