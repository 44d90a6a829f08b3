//! Error types for kvlink
//!
//! Provides a unified error type for all client operations.
//!
//! A key that is not present is NOT an error: facades report it as the
//! configured default (or `None`). Only [`ClientError::KeyNotFound`] from
//! `get_item` turns a miss into an error, on request.

use std::fmt;

use thiserror::Error;

use crate::outcome::Failure;
use crate::registry::Endpoint;

/// Result type alias using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// Unified error type for kvlink operations
#[derive(Debug, Error)]
pub enum ClientError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network failure: {0}")]
    Network(Failure),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Endpoint already registered: {0}")]
    AlreadyRegistered(Endpoint),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Stored value is not a NUL-terminated integer")]
    NotANumber,
}

impl ClientError {
    /// True if this error reports a network failure (as opposed to a
    /// configuration or codec problem)
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    /// The failure class, if this is a network failure
    pub fn failure(&self) -> Option<Failure> {
        match self {
            ClientError::Network(failure) => Some(*failure),
            _ => None,
        }
    }
}

impl From<Failure> for ClientError {
    fn from(failure: Failure) -> Self {
        ClientError::Network(failure)
    }
}

impl From<bincode::Error> for ClientError {
    fn from(err: bincode::Error) -> Self {
        ClientError::Codec(err.to_string())
    }
}

// The raw byte codec drives serde directly, so our error has to be usable
// as a serde error on both sides.
impl serde::ser::Error for ClientError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ClientError::Codec(msg.to_string())
    }
}

impl serde::de::Error for ClientError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ClientError::Codec(msg.to_string())
    }
}
