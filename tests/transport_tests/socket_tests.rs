//! Tests for SocketTransport
//!
//! These tests verify:
//! - TCP and UDP round trips against loopback servers
//! - Lazy connection for endpoints unreachable at registration
//! - Refused connections surface as errors, not hangs
//! - Unsupported kinds

use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use kvlink::protocol::{Command, Flags, ReplyCode, Request};
use kvlink::{
    Client, ClientError, Config, Endpoint, Failure, SocketTransport, Transport, TransportKind,
};

use crate::common::{init_tracing, memory_server, serve_tcp, spawn_tcp, spawn_udp};

fn get(id: u32, key: &[u8]) -> Request {
    Request::new(id, Flags::NONE, Command::Get { key: key.to_vec() })
}

fn set(id: u32, key: &[u8], value: &[u8]) -> Request {
    Request::new(
        id,
        Flags::NONE,
        Command::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        },
    )
}

#[test]
fn test_supported_kinds() {
    let transport = SocketTransport::default();
    assert!(transport.supports(TransportKind::Tcp));
    assert!(transport.supports(TransportKind::Udp));
    assert!(!transport.supports(TransportKind::Tipc));
    assert!(!transport.supports(TransportKind::Sctp));

    assert!(transport.prepare(&Endpoint::tipc(10)).is_err());
}

#[test]
fn test_tcp_round_trip() {
    init_tracing();
    let addr = spawn_tcp(memory_server());
    let endpoint = Endpoint::tcp("127.0.0.1", addr.port());

    let transport = SocketTransport::new(&Config::default());
    transport.prepare(&endpoint).unwrap();
    assert_eq!(transport.open_connections(), 1);

    let reply = transport.round_trip(&endpoint, &set(1, b"k", b"v")).unwrap();
    assert_eq!(reply.id, 1);
    assert_eq!(reply.reply_code(), Some(ReplyCode::Ok));

    let reply = transport.round_trip(&endpoint, &get(2, b"k")).unwrap();
    assert_eq!(reply.id, 2);
    assert_eq!(reply.value_bytes().unwrap(), b"v");
}

#[test]
fn test_udp_round_trip() {
    let server = memory_server();
    let addr = spawn_udp(server.clone());

    let client = Client::new(Config::builder().raw().build());
    client.add_udp("127.0.0.1", addr.port()).unwrap();

    client.direct().set("key", b"\0binary\n").unwrap();
    assert_eq!(
        client.direct().get::<_, Vec<u8>>("key").unwrap(),
        Some(b"\0binary\n".to_vec())
    );
    assert_eq!(server.cache_get(b"key"), Some(b"\0binary\n".to_vec()));
}

#[test]
fn test_lazy_connect_after_server_starts() {
    // Reserve a port, then release it so nothing listens at registration
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let transport = Arc::new(SocketTransport::default());
    let client = Client::with_transport(Config::default(), transport.clone());
    client.add_tcp("127.0.0.1", port).unwrap();
    assert_eq!(transport.open_connections(), 0);

    let err = client.direct().set("k", "v").unwrap_err();
    assert_eq!(err.failure(), Some(Failure::Transport));

    // Now serve on that port
    let listener = TcpListener::bind(("127.0.0.1", port)).unwrap();
    serve_tcp(listener, memory_server());

    client.direct().set("k", "v").unwrap();
    assert_eq!(transport.open_connections(), 1);
    assert_eq!(client.direct().get::<_, String>("k").unwrap().as_deref(), Some("v"));
}

#[test]
fn test_concurrent_requests_share_connection() {
    let addr = spawn_tcp(memory_server());
    let client = Arc::new(Client::new(Config::default()));
    client.add_tcp("127.0.0.1", addr.port()).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for i in 0..50u32 {
                    let key = format!("t{}-{}", t, i);
                    client.direct().set(&key, &i).unwrap();
                    assert_eq!(client.direct().get::<_, u32>(&key).unwrap(), Some(i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_timeout_is_reported() {
    // Accepts connections but never answers
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });

    let config = Config::builder().read_timeout_ms(100).build();
    let client = Client::new(config);
    client.add_tcp("127.0.0.1", port).unwrap();

    let err = client.direct().get::<_, String>("k").unwrap_err();
    assert_eq!(err.failure(), Some(Failure::Timeout));
}

#[test]
fn test_oversized_request_rejected_before_sending() {
    let server = memory_server();
    let addr = spawn_tcp(Arc::clone(&server));
    let endpoint = Endpoint::tcp("127.0.0.1", addr.port());

    let config = Config::builder().max_payload_size(16).build();
    let transport = SocketTransport::new(&config);
    transport.prepare(&endpoint).unwrap();

    let err = transport
        .round_trip(&endpoint, &set(1, b"k", &[7u8; 64]))
        .unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));
    assert_eq!(Failure::from(&err), Failure::Malformed);
    assert_eq!(server.requests_served(), 0);

    // The connection stays usable
    assert_eq!(transport.open_connections(), 1);
    let reply = transport.round_trip(&endpoint, &set(2, b"k", b"v")).unwrap();
    assert_eq!(reply.reply_code(), Some(ReplyCode::Ok));
}

#[test]
fn test_oversized_value_is_a_malformed_failure() {
    let addr = spawn_tcp(memory_server());
    let client = Client::new(Config::builder().max_payload_size(16).build());
    client.add_tcp("127.0.0.1", addr.port()).unwrap();

    let err = client.direct().set("k", &vec![7u8; 64]).unwrap_err();
    assert_eq!(err.failure(), Some(Failure::Malformed));
}
