//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! ┌──────────────────┬──────────┬──────────┬──────────────────┐
//! │ Ver(4b) + ID(28b)│ Cmd (2)  │ Flags (2)│     Payload      │
//! └──────────────────┴──────────┴──────────┴──────────────────┘
//! ```
//!
//! ### Payload by Command Type (all sizes u32, big endian)
//! - GET / DEL / NEXTKEY: ksize + key
//! - SET:                 ksize + vsize + key + value
//! - CAS:                 ksize + osize + nsize + key + old + new
//! - INCR:                ksize + key + delta (i64)
//! - STATS / FIRSTKEY:    empty
//!
//! ### Reply Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │  ID (4)  │ Code (4) │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Framing
//! Stream transports (TCP) prefix every message with a u32 total length
//! that counts the prefix itself. Datagram transports send the bare message.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{ClientError, Result};
use super::{Command, CommandType, Flags, Reply, Request};

/// Protocol version carried in the top 4 bits of every request
pub const PROTO_VERSION: u32 = 1;

/// Request header: version/id (4) + command (2) + flags (2)
pub const REQUEST_HEADER_SIZE: usize = 8;

/// Reply header: id (4) + code (4)
pub const REPLY_HEADER_SIZE: usize = 8;

/// Length prefix used by stream transports
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest datagram a reply can arrive in
pub const MAX_DATAGRAM_SIZE: usize = 128 * 1024;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes (unframed)
pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(REQUEST_HEADER_SIZE + 12 + request.command.payload_len());

    buf.put_u32((PROTO_VERSION << 28) | (request.id & Request::MAX_ID));
    buf.put_u16(request.command.command_type() as u16);
    buf.put_u16(request.flags.bits());

    match &request.command {
        Command::Get { key } | Command::Delete { key } | Command::NextKey { key } => {
            buf.put_u32(key.len() as u32);
            buf.put_slice(key);
        }
        Command::Set { key, value } => {
            buf.put_u32(key.len() as u32);
            buf.put_u32(value.len() as u32);
            buf.put_slice(key);
            buf.put_slice(value);
        }
        Command::Cas { key, old, new } => {
            buf.put_u32(key.len() as u32);
            buf.put_u32(old.len() as u32);
            buf.put_u32(new.len() as u32);
            buf.put_slice(key);
            buf.put_slice(old);
            buf.put_slice(new);
        }
        Command::Incr { key, delta } => {
            buf.put_u32(key.len() as u32);
            buf.put_slice(key);
            buf.put_i64(*delta);
        }
        Command::Stats | Command::FirstKey => {}
    }

    buf.to_vec()
}

/// Decode a request from bytes (unframed)
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    if bytes.len() < REQUEST_HEADER_SIZE {
        return Err(ClientError::Protocol(format!(
            "Incomplete request header: expected {} bytes, got {}",
            REQUEST_HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let header = buf.get_u32();
    let version = header >> 28;
    let id = header & Request::MAX_ID;
    let raw_command = buf.get_u16();
    let flags = Flags::from_bits(buf.get_u16());

    if version != PROTO_VERSION {
        return Err(ClientError::Protocol(format!(
            "Protocol version mismatch: expected {}, got {}",
            PROTO_VERSION, version
        )));
    }

    let command_type = CommandType::from_u16(raw_command).ok_or_else(|| {
        ClientError::Protocol(format!("Unknown command type: 0x{:x}", raw_command))
    })?;

    let command = match command_type {
        CommandType::Get => Command::Get {
            key: take_sized(&mut buf, "GET key")?,
        },
        CommandType::Delete => Command::Delete {
            key: take_sized(&mut buf, "DEL key")?,
        },
        CommandType::NextKey => Command::NextKey {
            key: take_sized(&mut buf, "NEXTKEY key")?,
        },
        CommandType::Set => {
            let sizes = take_sizes::<2>(&mut buf, "SET")?;
            let key = take_bytes(&mut buf, sizes[0], "SET key")?;
            let value = take_bytes(&mut buf, sizes[1], "SET value")?;
            Command::Set { key, value }
        }
        CommandType::Cas => {
            let sizes = take_sizes::<3>(&mut buf, "CAS")?;
            let key = take_bytes(&mut buf, sizes[0], "CAS key")?;
            let old = take_bytes(&mut buf, sizes[1], "CAS old value")?;
            let new = take_bytes(&mut buf, sizes[2], "CAS new value")?;
            Command::Cas { key, old, new }
        }
        CommandType::Incr => {
            let key = take_sized(&mut buf, "INCR key")?;
            if buf.remaining() < 8 {
                return Err(ClientError::Protocol(
                    "INCR command: missing increment".to_string(),
                ));
            }
            Command::Incr {
                key,
                delta: buf.get_i64(),
            }
        }
        CommandType::Stats => Command::Stats,
        CommandType::FirstKey => Command::FirstKey,
    };

    Ok(Request { id, flags, command })
}

/// Read `N` u32 sizes
fn take_sizes<const N: usize>(buf: &mut &[u8], what: &str) -> Result<[usize; N]> {
    if buf.remaining() < 4 * N {
        return Err(ClientError::Protocol(format!(
            "{} command: missing sizes",
            what
        )));
    }

    let mut sizes = [0usize; N];
    for size in sizes.iter_mut() {
        *size = buf.get_u32() as usize;
    }
    Ok(sizes)
}

/// Read a u32 size followed by that many bytes
fn take_sized(buf: &mut &[u8], what: &str) -> Result<Vec<u8>> {
    let [len] = take_sizes::<1>(buf, what)?;
    take_bytes(buf, len, what)
}

fn take_bytes(buf: &mut &[u8], len: usize, what: &str) -> Result<Vec<u8>> {
    if buf.remaining() < len {
        return Err(ClientError::Protocol(format!(
            "{}: incomplete (expected {}, got {})",
            what,
            len,
            buf.remaining()
        )));
    }

    let bytes = buf[..len].to_vec();
    buf.advance(len);
    Ok(bytes)
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply to bytes (unframed)
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(REPLY_HEADER_SIZE + reply.payload.len());
    buf.put_u32(reply.id);
    buf.put_u32(reply.code);
    buf.put_slice(&reply.payload);
    buf.to_vec()
}

/// Decode a reply from bytes (unframed)
///
/// Unknown reply codes are NOT rejected here, they are passed on raw.
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    if bytes.len() < REPLY_HEADER_SIZE {
        return Err(ClientError::Protocol(format!(
            "Incomplete reply header: expected {} bytes, got {}",
            REPLY_HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut buf = bytes;
    let id = buf.get_u32();
    let code = buf.get_u32();

    Ok(Reply {
        id,
        code,
        payload: buf.to_vec(),
    })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write one length-prefixed frame
pub fn write_frame<W: Write>(writer: &mut W, message: &[u8]) -> Result<()> {
    let total = (LENGTH_PREFIX_SIZE + message.len()) as u32;

    let mut frame = Vec::with_capacity(total as usize);
    frame.put_u32(total);
    frame.put_slice(message);

    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed frame, returning the message without prefix
///
/// Blocks until a complete frame is received or an error occurs
pub fn read_frame<R: Read>(reader: &mut R, max_message_size: usize) -> Result<Vec<u8>> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut prefix)?;

    let total = u32::from_be_bytes(prefix) as usize;
    if total < LENGTH_PREFIX_SIZE {
        return Err(ClientError::Protocol(format!(
            "Frame length {} shorter than its prefix",
            total
        )));
    }

    let message_len = total - LENGTH_PREFIX_SIZE;
    if message_len > max_message_size {
        return Err(ClientError::Protocol(format!(
            "Frame too large: {} bytes (max {})",
            message_len, max_message_size
        )));
    }

    let mut message = vec![0u8; message_len];
    if message_len > 0 {
        reader.read_exact(&mut message)?;
    }

    Ok(message)
}

/// Write a framed request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    write_frame(writer, &encode_request(request))
}

/// Read a framed request from a stream
pub fn read_request<R: Read>(reader: &mut R, max_message_size: usize) -> Result<Request> {
    decode_request(&read_frame(reader, max_message_size)?)
}

/// Write a framed reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    write_frame(writer, &encode_reply(reply))
}

/// Read a framed reply from a stream
pub fn read_reply<R: Read>(reader: &mut R, max_message_size: usize) -> Result<Reply> {
    decode_reply(&read_frame(reader, max_message_size)?)
}
