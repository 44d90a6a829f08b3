//! Codec Tests
//!
//! Tests for request and reply encoding/decoding.

use kvlink::protocol::{
    decode_reply, decode_request, encode_reply, encode_request, Command, Flags, Reply, ReplyCode,
    Request, ServerError, PROTO_VERSION,
};

fn roundtrip(command: Command, flags: Flags) -> Request {
    let request = Request::new(42, flags, command);
    let decoded = decode_request(&encode_request(&request)).unwrap();
    assert_eq!(decoded, request);
    decoded
}

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_request_header_layout() {
    let request = Request::new(5, Flags::SYNC, Command::Get { key: b"k".to_vec() });
    let encoded = encode_request(&request);

    // version in the top 4 bits, id below
    assert_eq!(&encoded[0..4], &((PROTO_VERSION << 28) | 5).to_be_bytes());
    assert_eq!(&encoded[4..6], &0x101u16.to_be_bytes());
    assert_eq!(&encoded[6..8], &2u16.to_be_bytes());
    assert_eq!(&encoded[8..12], &1u32.to_be_bytes());
    assert_eq!(&encoded[12..], b"k");
}

#[test]
fn test_request_id_is_masked_to_28_bits() {
    let request = Request::new(0xFFFF_FFFF, Flags::NONE, Command::Stats);
    assert_eq!(request.id, Request::MAX_ID);

    let decoded = decode_request(&encode_request(&request)).unwrap();
    assert_eq!(decoded.id, Request::MAX_ID);
}

#[test]
fn test_encode_decode_get() {
    let request = roundtrip(Command::Get { key: b"hello".to_vec() }, Flags::CACHE_ONLY);
    assert!(request.flags.cache_only());
    assert!(!request.flags.sync());
}

#[test]
fn test_encode_decode_set() {
    roundtrip(
        Command::Set {
            key: b"mykey".to_vec(),
            value: b"myvalue".to_vec(),
        },
        Flags::SYNC,
    );
}

#[test]
fn test_encode_decode_delete_and_next_key() {
    roundtrip(Command::Delete { key: b"gone".to_vec() }, Flags::NONE);
    roundtrip(Command::NextKey { key: b"a".to_vec() }, Flags::NONE);
}

#[test]
fn test_encode_decode_cas() {
    roundtrip(
        Command::Cas {
            key: b"k".to_vec(),
            old: b"old".to_vec(),
            new: b"brand new".to_vec(),
        },
        Flags::NONE,
    );
}

#[test]
fn test_encode_decode_incr() {
    roundtrip(
        Command::Incr {
            key: b"counter".to_vec(),
            delta: -7,
        },
        Flags::CACHE_ONLY,
    );
}

#[test]
fn test_encode_decode_keyless_commands() {
    roundtrip(Command::Stats, Flags::NONE);
    roundtrip(Command::FirstKey, Flags::NONE);
}

#[test]
fn test_encode_decode_binary_data() {
    // NUL and high bytes must survive untouched
    let binary_key: Vec<u8> = vec![0x00, 0x01, 0xFF, 0xFE, 0x80];
    let binary_value: Vec<u8> = (0..=255).collect();

    roundtrip(
        Command::Set {
            key: binary_key,
            value: binary_value,
        },
        Flags::NONE,
    );
}

#[test]
fn test_encode_decode_empty_value() {
    roundtrip(
        Command::Set {
            key: b"key".to_vec(),
            value: vec![],
        },
        Flags::NONE,
    );
}

// =============================================================================
// Reply Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_value_reply() {
    let reply = Reply::value(9, ReplyCode::Ok, b"10\0\n");
    let decoded = decode_reply(&encode_reply(&reply)).unwrap();

    assert_eq!(decoded.id, 9);
    assert_eq!(decoded.reply_code(), Some(ReplyCode::Ok));
    assert_eq!(decoded.value_bytes().unwrap(), b"10\0\n");
}

#[test]
fn test_encode_decode_error_reply() {
    let reply = Reply::error(3, ServerError::ReadOnly);
    let decoded = decode_reply(&encode_reply(&reply)).unwrap();

    assert_eq!(decoded.reply_code(), Some(ReplyCode::Error));
    assert_eq!(decoded.server_error().unwrap(), ServerError::ReadOnly);
}

#[test]
fn test_encode_decode_counter_and_stats() {
    let counter = decode_reply(&encode_reply(&Reply::counter(1, -3))).unwrap();
    assert_eq!(counter.counter_value().unwrap(), -3);

    let stats = decode_reply(&encode_reply(&Reply::stats(2, &[1, 2, 3]))).unwrap();
    assert_eq!(stats.stats_values().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_unknown_reply_code_passes_through() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&7u32.to_be_bytes());
    bytes.extend_from_slice(&0x9999u32.to_be_bytes());

    let reply = decode_reply(&bytes).unwrap();
    assert_eq!(reply.code, 0x9999);
    assert_eq!(reply.reply_code(), None);
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_incomplete_header() {
    let result = decode_request(&[0x10, 0x00, 0x00]);
    assert!(result.unwrap_err().to_string().contains("Incomplete request header"));

    let result = decode_reply(&[0x00; 7]);
    assert!(result.unwrap_err().to_string().contains("Incomplete reply header"));
}

#[test]
fn test_incomplete_payload() {
    let request = Request::new(
        1,
        Flags::NONE,
        Command::Set {
            key: b"key".to_vec(),
            value: b"value".to_vec(),
        },
    );
    let mut encoded = encode_request(&request);
    encoded.truncate(encoded.len() - 2);

    let result = decode_request(&encoded);
    assert!(result.unwrap_err().to_string().contains("incomplete"));
}

#[test]
fn test_version_mismatch() {
    let mut encoded = encode_request(&Request::new(1, Flags::NONE, Command::Stats));
    encoded[0] = 0x20;

    let result = decode_request(&encoded);
    assert!(result.unwrap_err().to_string().contains("version mismatch"));
}

#[test]
fn test_unknown_command_type() {
    let mut encoded = encode_request(&Request::new(1, Flags::NONE, Command::Stats));
    encoded[4] = 0x0F;

    let result = decode_request(&encoded);
    assert!(result.unwrap_err().to_string().contains("Unknown command type"));
}

#[test]
fn test_incr_missing_delta() {
    let mut encoded = encode_request(&Request::new(
        1,
        Flags::NONE,
        Command::Incr {
            key: b"n".to_vec(),
            delta: 1,
        },
    ));
    encoded.truncate(encoded.len() - 8);

    let result = decode_request(&encoded);
    assert!(result.unwrap_err().to_string().contains("missing increment"));
}
