//! End-to-end scenario: one TCP endpoint, a typed write, then a raw value
//! containing NUL and newline bytes
//!
//! Runs against the in-memory transport and against a real loopback TCP
//! server speaking the wire protocol.

use kvlink::{Client, Config, Encoding};

use crate::common::{memory_server, spawn_tcp};
use crate::memory_client;

fn run_scenario(client: &mut Client) {
    client.direct().set_item(&1, &2).unwrap();
    assert_eq!(client.direct().get_item::<_, i32>(&1).unwrap(), 2);

    client.set_encoding(Encoding::Raw);
    client.direct().set_item("I", b"10\0\n").unwrap();
    let value: Vec<u8> = client.direct().get_item("I").unwrap();
    assert_eq!(value, b"10\0\n");

    // the raw value is a counter the server can increment
    client.direct().set_item("n", b"10\0").unwrap();
    assert_eq!(client.direct().incr("n", 1).unwrap(), Some(11));
}

#[test]
fn test_scenario_in_memory() {
    let (_, mut client) = memory_client(Config::default());
    run_scenario(&mut client);
}

#[test]
fn test_scenario_over_tcp() {
    crate::common::init_tracing();
    let server = memory_server();
    let addr = spawn_tcp(server.clone());

    let mut client = Client::new(Config::default());
    client.add_tcp("127.0.0.1", addr.port()).unwrap();
    run_scenario(&mut client);

    assert_eq!(server.cache_get(b"I"), Some(b"10\0\n".to_vec()));
}

#[test]
fn test_iteration_and_stats_over_tcp() {
    let server = memory_server();
    let addr = spawn_tcp(server.clone());

    let client = Client::new(Config::builder().raw().build());
    client.add_tcp("127.0.0.1", addr.port()).unwrap();

    for key in ["b", "a", "c"] {
        client.synchronous().set(key, "v").unwrap();
    }

    let mut keys: Vec<String> = Vec::new();
    let mut next: Option<String> = client.first_key().unwrap();
    while let Some(key) = next {
        next = client.next_key(key.as_str()).unwrap();
        keys.push(key);
    }
    assert_eq!(keys, vec!["a", "b", "c"]);

    let stats = client.stats();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].0.port(), u32::from(addr.port()));
    assert!(!stats[0].1.as_ref().unwrap().is_empty());
}
