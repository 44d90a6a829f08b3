//! Reply definitions
//!
//! Represents replies received from the server.

use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::{ClientError, Result};

/// Reply codes (on-wire values, separate namespace from requests)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ReplyCode {
    Error = 0x800,
    CacheHit = 0x801,
    CacheMiss = 0x802,
    Ok = 0x803,
    NotIn = 0x804,
    NoMatch = 0x805,
}

impl ReplyCode {
    /// Parse an on-wire reply value; `None` for codes outside the protocol
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x800 => Some(ReplyCode::Error),
            0x801 => Some(ReplyCode::CacheHit),
            0x802 => Some(ReplyCode::CacheMiss),
            0x803 => Some(ReplyCode::Ok),
            0x804 => Some(ReplyCode::NotIn),
            0x805 => Some(ReplyCode::NoMatch),
            _ => None,
        }
    }
}

/// Error codes carried by an `Error` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerError {
    VersionMismatch,
    Send,
    BrokenRequest,
    UnknownRequest,
    Memory,
    Database,
    ReadOnly,
    Other(u32),
}

impl ServerError {
    pub fn code(&self) -> u32 {
        match self {
            ServerError::VersionMismatch => 0x101,
            ServerError::Send => 0x102,
            ServerError::BrokenRequest => 0x103,
            ServerError::UnknownRequest => 0x104,
            ServerError::Memory => 0x105,
            ServerError::Database => 0x106,
            ServerError::ReadOnly => 0x107,
            ServerError::Other(code) => *code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            0x101 => ServerError::VersionMismatch,
            0x102 => ServerError::Send,
            0x103 => ServerError::BrokenRequest,
            0x104 => ServerError::UnknownRequest,
            0x105 => ServerError::Memory,
            0x106 => ServerError::Database,
            0x107 => ServerError::ReadOnly,
            other => ServerError::Other(other),
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::VersionMismatch => f.write_str("protocol version mismatch"),
            ServerError::Send => f.write_str("server failed to send"),
            ServerError::BrokenRequest => f.write_str("broken request"),
            ServerError::UnknownRequest => f.write_str("unknown request"),
            ServerError::Memory => f.write_str("server out of memory"),
            ServerError::Database => f.write_str("database error"),
            ServerError::ReadOnly => f.write_str("server is read-only"),
            ServerError::Other(code) => write!(f, "server error 0x{:x}", code),
        }
    }
}

/// A reply as received from the wire
///
/// `code` is kept raw: codes outside [`ReplyCode`] are a protocol
/// violation that the caller has to see, not a decode failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Id of the request this answers
    pub id: u32,

    /// Raw reply code
    pub code: u32,

    /// Code-specific payload
    pub payload: Vec<u8>,
}

impl Reply {
    /// A reply carrying only a code
    pub fn mini(id: u32, code: ReplyCode) -> Self {
        Self {
            id,
            code: code as u32,
            payload: Vec::new(),
        }
    }

    /// An `Error` reply
    pub fn error(id: u32, error: ServerError) -> Self {
        Self {
            id,
            code: ReplyCode::Error as u32,
            payload: error.code().to_be_bytes().to_vec(),
        }
    }

    /// A reply carrying a length-prefixed value (GET hits, key iteration)
    pub fn value(id: u32, code: ReplyCode, value: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(4 + value.len());
        payload.put_u32(value.len() as u32);
        payload.put_slice(value);
        Self {
            id,
            code: code as u32,
            payload,
        }
    }

    /// A successful INCR reply carrying the new value
    pub fn counter(id: u32, value: i64) -> Self {
        Self {
            id,
            code: ReplyCode::Ok as u32,
            payload: value.to_be_bytes().to_vec(),
        }
    }

    /// A successful STATS reply
    pub fn stats(id: u32, counters: &[u64]) -> Self {
        let mut payload = Vec::with_capacity(4 + counters.len() * 8);
        payload.put_u32(counters.len() as u32);
        for counter in counters {
            payload.put_u64(*counter);
        }
        Self {
            id,
            code: ReplyCode::Ok as u32,
            payload,
        }
    }

    /// The reply code, if it is one the protocol defines
    pub fn reply_code(&self) -> Option<ReplyCode> {
        ReplyCode::from_u32(self.code)
    }

    /// Error code of an `Error` reply
    pub fn server_error(&self) -> Result<ServerError> {
        let mut buf = self.payload.as_slice();
        if buf.remaining() < 4 {
            return Err(ClientError::Protocol(
                "error reply: missing error code".to_string(),
            ));
        }
        Ok(ServerError::from_code(buf.get_u32()))
    }

    /// Length-prefixed value of a value reply
    pub fn value_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = self.payload.as_slice();
        if buf.remaining() < 4 {
            return Err(ClientError::Protocol(
                "value reply: missing value length".to_string(),
            ));
        }

        let len = buf.get_u32() as usize;
        if buf.remaining() < len {
            return Err(ClientError::Protocol(format!(
                "value reply: incomplete value (expected {}, got {})",
                len,
                buf.remaining()
            )));
        }

        Ok(buf[..len].to_vec())
    }

    /// New value carried by an INCR reply
    pub fn counter_value(&self) -> Result<i64> {
        let mut buf = self.payload.as_slice();
        if buf.remaining() < 8 {
            return Err(ClientError::Protocol(format!(
                "incr reply: expected 8 bytes, got {}",
                buf.remaining()
            )));
        }
        Ok(buf.get_i64())
    }

    /// Counters carried by a STATS reply
    pub fn stats_values(&self) -> Result<Vec<u64>> {
        let mut buf = self.payload.as_slice();
        if buf.remaining() < 4 {
            return Err(ClientError::Protocol(
                "stats reply: missing counter count".to_string(),
            ));
        }

        let count = buf.get_u32() as usize;
        if buf.remaining() < count * 8 {
            return Err(ClientError::Protocol(format!(
                "stats reply: expected {} counters, got {} bytes",
                count,
                buf.remaining()
            )));
        }

        Ok((0..count).map(|_| buf.get_u64()).collect())
    }
}
