//! Transport Module
//!
//! The network capability the primitive layer consumes.
//!
//! A transport performs exactly one round trip per call: it sends one
//! request to one endpoint and returns the raw reply, or an error if no
//! reply could be obtained. It never retries and never interprets reply
//! codes.
//!
//! ## Implementations
//! - [`SocketTransport`]: TCP and UDP over `std::net`
//! - [`MemoryTransport`]: in-process servers, one per endpoint, for all
//!   four transport kinds (tests, benchmarks, embedding)

mod socket;
mod memory;

pub use socket::SocketTransport;
pub use memory::{MemoryOptions, MemoryServer, MemoryTransport, STATS_COUNTERS};

use crate::error::Result;
use crate::protocol::{Reply, Request};
use crate::registry::{Endpoint, TransportKind};

/// Performs request/reply round trips against endpoints
pub trait Transport: Send + Sync {
    /// True if endpoints of this kind can be served
    fn supports(&self, kind: TransportKind) -> bool;

    /// Called once when an endpoint is registered
    ///
    /// Errors here are configuration errors (the endpoint cannot be used at
    /// all). An endpoint that is merely unreachable right now should be
    /// accepted and reported by `round_trip` later.
    fn prepare(&self, _endpoint: &Endpoint) -> Result<()> {
        Ok(())
    }

    /// Send `request` to `endpoint` and wait for its reply
    fn round_trip(&self, endpoint: &Endpoint, request: &Request) -> Result<Reply>;
}
