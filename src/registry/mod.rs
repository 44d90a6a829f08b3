//! Transport Registry
//!
//! Tracks the configured server endpoints of one client.
//!
//! ## Responsibilities
//! - Validate endpoint parameters at registration time
//! - Reject duplicate registrations
//! - Keep endpoints in registration order
//! - Select an endpoint per request from a consistent snapshot
//!
//! ## Concurrency
//! The endpoint list is read-mostly: selection takes a read lock for the
//! duration of one decision, registration takes the write lock. A selection
//! therefore never observes a half-applied registration.

mod endpoint;
mod selection;

pub use endpoint::{
    Endpoint, TransportKind, DEFAULT_PORT, DEFAULT_TIPC_INSTANCE, TIPC_SERVICE_TYPE,
};
pub use selection::{checksum, SelectionPolicy};

use parking_lot::RwLock;

use crate::error::{ClientError, Result};

/// Registered endpoints of a client
#[derive(Debug, Default)]
pub struct Registry {
    /// Endpoints in registration order
    endpoints: RwLock<Vec<Endpoint>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint
    ///
    /// Registering an endpoint that is already present is rejected with
    /// `AlreadyRegistered` and leaves the registry unchanged.
    pub fn register(&self, endpoint: Endpoint) -> Result<()> {
        endpoint.validate()?;

        let mut endpoints = self.endpoints.write();
        if endpoints.contains(&endpoint) {
            return Err(ClientError::AlreadyRegistered(endpoint));
        }

        endpoints.push(endpoint);
        Ok(())
    }

    /// True if the endpoint is registered
    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.endpoints.read().contains(endpoint)
    }

    /// All endpoints, in registration order
    pub fn list(&self) -> Vec<Endpoint> {
        self.endpoints.read().clone()
    }

    /// The first registered endpoint
    pub fn first(&self) -> Option<Endpoint> {
        self.endpoints.read().first().cloned()
    }

    /// Select the endpoint for `key` under `policy`
    pub fn select(&self, policy: SelectionPolicy, key: &[u8]) -> Option<Endpoint> {
        let endpoints = self.endpoints.read();
        policy.select(&endpoints, key).cloned()
    }

    /// Number of registered endpoints
    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }
}
