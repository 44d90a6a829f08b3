//! Tests for MemoryTransport and MemoryServer

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use kvlink::protocol::{Command, Flags, Reply, ReplyCode, Request};
use kvlink::transport::{MemoryOptions, MemoryServer, STATS_COUNTERS};
use kvlink::{ClientError, Endpoint, MemoryTransport, Transport, TransportKind};

// =============================================================================
// Helper Functions
// =============================================================================

fn request(flags: Flags, command: Command) -> Request {
    Request::new(1, flags, command)
}

fn code(reply: &Reply) -> Option<ReplyCode> {
    reply.reply_code()
}

// =============================================================================
// Server Tests
// =============================================================================

#[test]
fn test_get_reports_tier() {
    let server = MemoryServer::default();
    let get = request(Flags::NONE, Command::Get { key: b"k".to_vec() });

    assert_eq!(code(&server.handle(&get)), Some(ReplyCode::NotIn));

    server.handle(&request(
        Flags::SYNC,
        Command::Set {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        },
    ));
    assert_eq!(code(&server.handle(&get)), Some(ReplyCode::CacheHit));

    server.evict(b"k");
    let reply = server.handle(&get);
    assert_eq!(code(&reply), Some(ReplyCode::Ok));
    assert_eq!(reply.value_bytes().unwrap(), b"v");
}

#[test]
fn test_cache_only_get_miss() {
    let server = MemoryServer::default();
    let get = request(Flags::CACHE_ONLY, Command::Get { key: b"k".to_vec() });

    assert_eq!(code(&server.handle(&get)), Some(ReplyCode::CacheMiss));
}

#[test]
fn test_sync_write_waits_for_database() {
    let delay = Duration::from_millis(100);
    let server = MemoryServer::new(&MemoryOptions {
        write_delay: delay,
        ..MemoryOptions::default()
    });

    let start = Instant::now();
    server.handle(&request(
        Flags::SYNC,
        Command::Set {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        },
    ));
    assert!(start.elapsed() >= delay);
    assert_eq!(server.db_get(b"k"), Some(b"v".to_vec()));
}

#[test]
fn test_database_reads_wait_for_queued_writes() {
    let server = MemoryServer::new(&MemoryOptions {
        write_delay: Duration::from_millis(100),
        ..MemoryOptions::default()
    });

    server.handle(&request(
        Flags::NONE,
        Command::Set {
            key: b"k".to_vec(),
            value: b"old".to_vec(),
        },
    ));
    server.evict(b"k");

    let cas = server.handle(&request(
        Flags::NONE,
        Command::Cas {
            key: b"k".to_vec(),
            old: b"old".to_vec(),
            new: b"new".to_vec(),
        },
    ));
    assert_eq!(code(&cas), Some(ReplyCode::Ok));

    server.evict(b"k");
    let reply = server.handle(&request(Flags::NONE, Command::Get { key: b"k".to_vec() }));
    assert_eq!(code(&reply), Some(ReplyCode::Ok));
    assert_eq!(reply.value_bytes().unwrap(), b"new");
}

#[test]
fn test_capacity_evicts_oldest() {
    let server = MemoryServer::new(&MemoryOptions {
        cache_capacity: Some(2),
        ..MemoryOptions::default()
    });

    for key in [&b"a"[..], b"b", b"c"] {
        server.handle(&request(
            Flags::CACHE_ONLY,
            Command::Set {
                key: key.to_vec(),
                value: b"v".to_vec(),
            },
        ));
    }

    assert_eq!(server.cache_get(b"a"), None);
    assert!(server.cache_get(b"b").is_some());
    assert!(server.cache_get(b"c").is_some());
}

#[test]
fn test_overwrite_does_not_evict() {
    let server = MemoryServer::new(&MemoryOptions {
        cache_capacity: Some(2),
        ..MemoryOptions::default()
    });
    let set = |key: &[u8], value: &[u8]| {
        server.handle(&request(
            Flags::CACHE_ONLY,
            Command::Set {
                key: key.to_vec(),
                value: value.to_vec(),
            },
        ))
    };

    set(b"a", b"1");
    set(b"b", b"1");
    set(b"a", b"2");

    assert_eq!(server.cache_get(b"a"), Some(b"2".to_vec()));
    assert_eq!(server.cache_get(b"b"), Some(b"1".to_vec()));
}

#[test]
fn test_stats_counters() {
    let server = MemoryServer::default();
    server.handle(&request(Flags::NONE, Command::Get { key: b"k".to_vec() }));

    let reply = server.handle(&request(Flags::NONE, Command::Stats));
    let counters = reply.stats_values().unwrap();
    assert_eq!(counters.len(), STATS_COUNTERS);
    // requests, cache hits, cache misses, db hits, db misses
    assert_eq!(&counters[..5], &[2, 0, 1, 0, 1]);
}

#[test]
fn test_drop_with_queued_writes() {
    let server = MemoryServer::new(&MemoryOptions {
        write_delay: Duration::from_millis(5),
        ..MemoryOptions::default()
    });
    for i in 0..5u8 {
        server.handle(&request(
            Flags::NONE,
            Command::Set {
                key: vec![i],
                value: vec![i],
            },
        ));
    }
    // joins the worker after the queue drained
    drop(server);
}

// =============================================================================
// Transport Tests
// =============================================================================

#[test]
fn test_supports_every_kind() {
    let transport = MemoryTransport::new();
    for kind in [
        TransportKind::Tcp,
        TransportKind::Udp,
        TransportKind::Tipc,
        TransportKind::Sctp,
    ] {
        assert!(transport.supports(kind));
    }
}

#[test]
fn test_unknown_endpoint_is_refused() {
    let transport = MemoryTransport::new();
    let endpoint = Endpoint::tipc(10);

    match transport.round_trip(&endpoint, &request(Flags::NONE, Command::Stats)) {
        Err(ClientError::Io(e)) => assert_eq!(e.kind(), ErrorKind::ConnectionRefused),
        other => panic!("Expected a refused connection, got {:?}", other),
    }
    assert!(!transport.set_reachable(&endpoint, false));
}

#[test]
fn test_endpoints_have_separate_servers() {
    let transport = MemoryTransport::new();
    let a = Endpoint::tcp("a", 1);
    let b = Endpoint::udp("a", 1);
    transport.prepare(&a).unwrap();
    transport.prepare(&b).unwrap();

    let set = request(
        Flags::CACHE_ONLY,
        Command::Set {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        },
    );
    transport.round_trip(&a, &set).unwrap();

    assert!(transport.server(&a).unwrap().cache_get(b"k").is_some());
    assert!(transport.server(&b).unwrap().cache_get(b"k").is_none());
    assert_eq!(transport.requests_served(&a), 1);
    assert_eq!(transport.requests_served(&b), 0);
}

#[test]
fn test_reachability_switch() {
    let transport = MemoryTransport::new();
    let endpoint = Endpoint::sctp("host", 9);
    transport.prepare(&endpoint).unwrap();
    let stats = request(Flags::NONE, Command::Stats);

    assert!(transport.set_reachable(&endpoint, false));
    assert!(transport.round_trip(&endpoint, &stats).is_err());

    transport.set_reachable(&endpoint, true);
    assert!(transport.round_trip(&endpoint, &stats).is_ok());
}
