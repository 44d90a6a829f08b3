//! Framing Tests
//!
//! Length-prefixed frames as used on stream transports.

use std::io::{Cursor, ErrorKind};

use kvlink::protocol::{
    read_frame, read_reply, read_request, write_frame, write_reply, write_request, Command,
    Flags, Reply, ReplyCode, Request,
};
use kvlink::ClientError;

const MAX: usize = 64 * 1024;

#[test]
fn test_length_prefix_counts_itself() {
    let mut buf = Vec::new();
    write_frame(&mut buf, b"abc").unwrap();

    assert_eq!(&buf[..4], &7u32.to_be_bytes());
    assert_eq!(&buf[4..], b"abc");
}

#[test]
fn test_read_frame_roundtrip() {
    let mut buf = Vec::new();
    write_frame(&mut buf, b"first").unwrap();
    write_frame(&mut buf, b"").unwrap();
    write_frame(&mut buf, b"third").unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(read_frame(&mut cursor, MAX).unwrap(), b"first");
    assert_eq!(read_frame(&mut cursor, MAX).unwrap(), b"");
    assert_eq!(read_frame(&mut cursor, MAX).unwrap(), b"third");
}

#[test]
fn test_request_and_reply_over_stream() {
    let request = Request::new(
        11,
        Flags::SYNC,
        Command::Set {
            key: b"I".to_vec(),
            value: b"10\0\n".to_vec(),
        },
    );
    let reply = Reply::mini(11, ReplyCode::Ok);

    let mut buf = Vec::new();
    write_request(&mut buf, &request).unwrap();
    write_reply(&mut buf, &reply).unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(read_request(&mut cursor, MAX).unwrap(), request);
    assert_eq!(read_reply(&mut cursor, MAX).unwrap(), reply);
}

#[test]
fn test_oversized_frame_rejected() {
    let mut buf = Vec::new();
    write_frame(&mut buf, &vec![0u8; 100]).unwrap();

    let result = read_frame(&mut Cursor::new(buf), 64);
    assert!(matches!(result, Err(ClientError::Protocol(_))));
}

#[test]
fn test_prefix_shorter_than_itself_rejected() {
    let buf = 2u32.to_be_bytes().to_vec();

    let result = read_frame(&mut Cursor::new(buf), MAX);
    assert!(matches!(result, Err(ClientError::Protocol(_))));
}

#[test]
fn test_truncated_frame_is_eof() {
    let mut buf = Vec::new();
    write_frame(&mut buf, b"complete message").unwrap();
    buf.truncate(10);

    match read_frame(&mut Cursor::new(buf), MAX) {
        Err(ClientError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF, got {:?}", other),
    }
}
