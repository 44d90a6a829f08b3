//! Configuration for kvlink clients
//!
//! Centralized configuration with sensible defaults.
//!
//! The default value substituted on a miss is not part of `Config`: it is
//! an application value and is stored (encoded) on the client itself, see
//! `Client::set_default`.

use crate::codec::Encoding;
use crate::registry::SelectionPolicy;

/// Maximum payload accepted by the server for a single key + value (64 KiB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Encoding Configuration
    // -------------------------------------------------------------------------
    /// Whether keys and values go through the structured codec or are sent
    /// as raw bytes
    pub encoding: Encoding,

    // -------------------------------------------------------------------------
    // Endpoint Configuration
    // -------------------------------------------------------------------------
    /// How a request picks one of the registered endpoints
    pub selection: SelectionPolicy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Reply read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Request write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    /// Largest frame payload accepted or sent (bytes)
    pub max_payload_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            encoding: Encoding::Auto,
            selection: SelectionPolicy::First,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the encoding policy
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.config.encoding = encoding;
        self
    }

    /// Send keys and values as raw bytes (shorthand for `Encoding::Raw`)
    pub fn raw(self) -> Self {
        self.encoding(Encoding::Raw)
    }

    /// Set the endpoint selection policy
    pub fn selection(mut self, policy: SelectionPolicy) -> Self {
        self.config.selection = policy;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the maximum frame payload size (in bytes)
    pub fn max_payload_size(mut self, size: usize) -> Self {
        self.config.max_payload_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
