//! Outcome Interpreter
//!
//! Translates the raw statuses of the primitive layer into typed outcomes,
//! and is the only place where a network failure becomes an error.
//!
//! ## Read outcomes
//! ```text
//!   Done + bytes  ──► Found(bytes)
//!   Absent        ──► NotFound
//!   Failed(f)     ──► NetworkFailure(f)
//!   anything else ──► NetworkFailure(Malformed | UnexpectedReply)
//! ```
//!
//! ## CAS codes
//! ```text
//!   code == 0   ──► NotFound        (key absent, nothing swapped)
//!   code <  0   ──► NetworkFailure  (Failure::from_code(code))
//!                   -1..=-5 local failures, -(0x1000 + e) server error e
//!   code == 1   ──► Mismatch        (key present, old value differs)
//!   code >= 2   ──► Applied(code)   (swap committed)
//! ```

use std::fmt;
use std::io;

use thiserror::Error;

use crate::error::{ClientError, Result};
use crate::primitive::Status;
use crate::protocol::ServerError;

/// Raw CAS code: the swap was committed
pub const CAS_APPLIED: i64 = 2;

/// Raw CAS code: the key exists but holds a different value
pub const CAS_MISMATCH: i64 = 1;

/// Raw CAS code: the key is absent
pub const CAS_NOT_FOUND: i64 = 0;

/// Server error `e` is reported as `-(SERVER_CODE_BASE + e)`, clear of the
/// local failure codes and of every non-negative CAS code
pub const SERVER_CODE_BASE: i64 = 0x1000;

// =============================================================================
// Failure classes
// =============================================================================

/// Why a request did not produce an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Failure {
    /// No endpoint is registered
    #[error("no endpoint registered")]
    NoEndpoint,

    /// Connecting, sending or receiving failed
    #[error("transport error")]
    Transport,

    /// No reply within the configured timeout
    #[error("timed out")]
    Timeout,

    /// The reply could not be parsed or did not match the request
    #[error("malformed reply")]
    Malformed,

    /// The reply code is outside the documented set
    #[error("unexpected reply")]
    UnexpectedReply,

    /// The server answered with an error reply
    #[error("server error: {0}")]
    Server(ServerError),
}

impl Failure {
    /// Stable negative code, as returned by the raw CAS primitive
    pub fn code(&self) -> i64 {
        match self {
            Failure::NoEndpoint => -1,
            Failure::Transport => -2,
            Failure::Timeout => -3,
            Failure::Malformed => -4,
            Failure::UnexpectedReply => -5,
            Failure::Server(error) => -(SERVER_CODE_BASE + i64::from(error.code())),
        }
    }

    /// Inverse of [`Failure::code`]; `None` for non-negative codes
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            c if c >= 0 => None,
            -1 => Some(Failure::NoEndpoint),
            -2 => Some(Failure::Transport),
            -3 => Some(Failure::Timeout),
            -4 => Some(Failure::Malformed),
            -5 => Some(Failure::UnexpectedReply),
            c => {
                let server_code = c
                    .checked_neg()
                    .and_then(|n| n.checked_sub(SERVER_CODE_BASE))
                    .and_then(|n| u32::try_from(n).ok());
                match server_code {
                    Some(code) => Some(Failure::Server(ServerError::from_code(code))),
                    None => Some(Failure::Malformed),
                }
            }
        }
    }
}

impl From<&ClientError> for Failure {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Network(failure) => *failure,
            ClientError::Io(e) => match e.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Failure::Timeout,
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => Failure::Malformed,
                _ => Failure::Transport,
            },
            ClientError::Protocol(_) => Failure::Malformed,
            _ => Failure::Transport,
        }
    }
}

// =============================================================================
// Typed outcomes
// =============================================================================

/// Result of a read-like primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Found(Vec<u8>),
    NotFound,
    NetworkFailure(Failure),
}

impl Outcome {
    /// Signal a network failure as an error; a miss stays a value
    pub fn into_result(self) -> Result<Option<Vec<u8>>> {
        match self {
            Outcome::Found(bytes) => Ok(Some(bytes)),
            Outcome::NotFound => Ok(None),
            Outcome::NetworkFailure(failure) => Err(ClientError::Network(failure)),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }
}

/// Result of a compare-and-swap primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// Swap committed; carries the positive code as evidence
    Applied(u64),

    /// Key present, stored value differs from the expected one
    Mismatch,

    /// Key absent, nothing swapped
    NotFound,

    NetworkFailure(Failure),
}

/// Caller-facing CAS result once network failures became errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swap {
    Applied(u64),
    Mismatch,
    NotFound,
}

impl CasOutcome {
    pub fn into_result(self) -> Result<Swap> {
        match self {
            CasOutcome::Applied(code) => Ok(Swap::Applied(code)),
            CasOutcome::Mismatch => Ok(Swap::Mismatch),
            CasOutcome::NotFound => Ok(Swap::NotFound),
            CasOutcome::NetworkFailure(failure) => Err(ClientError::Network(failure)),
        }
    }
}

impl Swap {
    pub fn applied(&self) -> bool {
        matches!(self, Swap::Applied(_))
    }
}

impl fmt::Display for Swap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Swap::Applied(code) => write!(f, "applied ({})", code),
            Swap::Mismatch => f.write_str("mismatch"),
            Swap::NotFound => f.write_str("not found"),
        }
    }
}

// =============================================================================
// Interpretation
// =============================================================================

/// Interpret a read primitive's status and bytes
pub fn interpret_read(raw: (Status, Option<Vec<u8>>)) -> Outcome {
    match raw {
        (Status::Done, Some(bytes)) => Outcome::Found(bytes),
        (Status::Done, None) => {
            tracing::warn!("Read reply reported success without a value");
            Outcome::NetworkFailure(Failure::Malformed)
        }
        (Status::Absent, _) => Outcome::NotFound,
        (Status::NoMatch, _) => {
            tracing::warn!("Read reply carried a no-match status");
            Outcome::NetworkFailure(Failure::UnexpectedReply)
        }
        (Status::Failed(failure), _) => Outcome::NetworkFailure(failure),
    }
}

/// Interpret a write primitive's status
pub fn interpret_write(status: Status) -> Result<()> {
    match status {
        Status::Done => Ok(()),
        Status::Failed(failure) => Err(ClientError::Network(failure)),
        other => {
            tracing::warn!("Write reply carried unexpected status {:?}", other);
            Err(ClientError::Network(Failure::UnexpectedReply))
        }
    }
}

/// Interpret a delete primitive's status; `false` means the key was absent
pub fn interpret_delete(status: Status) -> Result<bool> {
    match status {
        Status::Done => Ok(true),
        Status::Absent => Ok(false),
        Status::Failed(failure) => Err(ClientError::Network(failure)),
        Status::NoMatch => {
            tracing::warn!("Delete reply carried a no-match status");
            Err(ClientError::Network(Failure::UnexpectedReply))
        }
    }
}

/// Interpret a raw CAS code
pub fn interpret_cas(code: i64) -> CasOutcome {
    match code {
        CAS_NOT_FOUND => CasOutcome::NotFound,
        CAS_MISMATCH => CasOutcome::Mismatch,
        c if c < 0 => {
            CasOutcome::NetworkFailure(Failure::from_code(c).unwrap_or(Failure::Malformed))
        }
        c => CasOutcome::Applied(c as u64),
    }
}

/// Interpret an increment; `None` means the key was absent
pub fn interpret_incr(raw: (Status, Option<i64>)) -> Result<Option<i64>> {
    match raw {
        (Status::Done, Some(value)) => Ok(Some(value)),
        (Status::Done, None) => {
            tracing::warn!("Incr reply reported success without a value");
            Err(ClientError::Network(Failure::Malformed))
        }
        (Status::Absent, _) => Ok(None),
        (Status::NoMatch, _) => Err(ClientError::NotANumber),
        (Status::Failed(failure), _) => Err(ClientError::Network(failure)),
    }
}

/// Interpret a stats primitive's status and counters
pub fn interpret_stats(raw: (Status, Vec<u64>)) -> Result<Vec<u64>> {
    match raw {
        (Status::Done, counters) => Ok(counters),
        (Status::Failed(failure), _) => Err(ClientError::Network(failure)),
        (other, _) => {
            tracing::warn!("Stats reply carried unexpected status {:?}", other);
            Err(ClientError::Network(Failure::UnexpectedReply))
        }
    }
}
