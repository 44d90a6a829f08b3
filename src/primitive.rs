//! Primitive Operation Client
//!
//! Issues the primitive operations against the registered endpoints and
//! reports raw statuses.
//!
//! ## Responsibilities
//! - Select one endpoint per request (registry snapshot + policy)
//! - Build the request, tag it with a fresh id, hand it to the transport
//! - Map the reply code onto [`Status`]
//!
//! Nothing here raises for network problems: an unreachable endpoint, a
//! timeout or an unexpected reply all come back as `Status::Failed`. Every
//! call makes exactly one attempt.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::outcome::{Failure, CAS_APPLIED, CAS_MISMATCH, CAS_NOT_FOUND};
use crate::protocol::{Command, Flags, Reply, ReplyCode, Request};
use crate::registry::{Endpoint, Registry, SelectionPolicy};
use crate::transport::Transport;

/// Raw status of a primitive operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The server performed the operation (or found the key)
    Done,

    /// The key is not present
    Absent,

    /// The key is present but the operation's condition did not hold
    NoMatch,

    /// No usable answer
    Failed(Failure),
}

impl Status {
    pub fn is_done(&self) -> bool {
        matches!(self, Status::Done)
    }
}

/// Issues primitive operations over a transport
pub struct PrimitiveClient {
    /// Endpoints to pick from
    registry: Registry,

    /// Performs the network round trips
    transport: Arc<dyn Transport>,

    /// Endpoint selection rule
    policy: SelectionPolicy,

    /// Source of request ids
    next_id: AtomicU32,
}

impl PrimitiveClient {
    pub fn new(transport: Arc<dyn Transport>, policy: SelectionPolicy) -> Self {
        Self {
            registry: Registry::new(),
            transport,
            policy,
            next_id: AtomicU32::new(1),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: SelectionPolicy) {
        self.policy = policy;
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Best-effort write: acknowledged before the database write completes
    pub fn primitive_set(&self, key: &[u8], value: &[u8]) -> Status {
        self.set_with(Flags::NONE, key, value)
    }

    /// Durable write: acknowledged after the database write completed
    pub fn primitive_set_confirmed(&self, key: &[u8], value: &[u8]) -> Status {
        self.set_with(Flags::SYNC, key, value)
    }

    /// Cache-tier write: the server may evict it at any time
    pub fn primitive_cache_set(&self, key: &[u8], value: &[u8]) -> Status {
        self.set_with(Flags::CACHE_ONLY, key, value)
    }

    fn set_with(&self, flags: Flags, key: &[u8], value: &[u8]) -> Status {
        let command = Command::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        };
        match self.dispatch(flags, command) {
            Ok(reply) => status_of(&reply),
            Err(failure) => Status::Failed(failure),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn primitive_get(&self, key: &[u8]) -> (Status, Option<Vec<u8>>) {
        self.get_with(Flags::NONE, key)
    }

    pub fn primitive_cache_get(&self, key: &[u8]) -> (Status, Option<Vec<u8>>) {
        self.get_with(Flags::CACHE_ONLY, key)
    }

    fn get_with(&self, flags: Flags, key: &[u8]) -> (Status, Option<Vec<u8>>) {
        let command = Command::Get { key: key.to_vec() };
        match self.dispatch(flags, command) {
            Ok(reply) => with_value(&reply),
            Err(failure) => (Status::Failed(failure), None),
        }
    }

    // =========================================================================
    // Deletes
    // =========================================================================

    pub fn primitive_delete(&self, key: &[u8]) -> Status {
        self.delete_with(Flags::NONE, key)
    }

    pub fn primitive_delete_confirmed(&self, key: &[u8]) -> Status {
        self.delete_with(Flags::SYNC, key)
    }

    pub fn primitive_cache_delete(&self, key: &[u8]) -> Status {
        self.delete_with(Flags::CACHE_ONLY, key)
    }

    fn delete_with(&self, flags: Flags, key: &[u8]) -> Status {
        let command = Command::Delete { key: key.to_vec() };
        match self.dispatch(flags, command) {
            Ok(reply) => status_of(&reply),
            Err(failure) => Status::Failed(failure),
        }
    }

    // =========================================================================
    // Compare-and-swap
    // =========================================================================

    /// Signed code: 0 = absent, negative = failure, positive = answered
    /// (`CAS_APPLIED` or `CAS_MISMATCH`)
    pub fn primitive_cas(&self, key: &[u8], old: &[u8], new: &[u8]) -> i64 {
        self.cas_with(Flags::NONE, key, old, new)
    }

    pub fn primitive_cache_cas(&self, key: &[u8], old: &[u8], new: &[u8]) -> i64 {
        self.cas_with(Flags::CACHE_ONLY, key, old, new)
    }

    fn cas_with(&self, flags: Flags, key: &[u8], old: &[u8], new: &[u8]) -> i64 {
        let command = Command::Cas {
            key: key.to_vec(),
            old: old.to_vec(),
            new: new.to_vec(),
        };
        let status = match self.dispatch(flags, command) {
            Ok(reply) => status_of(&reply),
            Err(failure) => Status::Failed(failure),
        };

        match status {
            Status::Done => CAS_APPLIED,
            Status::NoMatch => CAS_MISMATCH,
            Status::Absent => CAS_NOT_FOUND,
            Status::Failed(failure) => failure.code(),
        }
    }

    // =========================================================================
    // Increment
    // =========================================================================

    pub fn primitive_incr(&self, key: &[u8], delta: i64) -> (Status, Option<i64>) {
        self.incr_with(Flags::NONE, key, delta)
    }

    pub fn primitive_cache_incr(&self, key: &[u8], delta: i64) -> (Status, Option<i64>) {
        self.incr_with(Flags::CACHE_ONLY, key, delta)
    }

    fn incr_with(&self, flags: Flags, key: &[u8], delta: i64) -> (Status, Option<i64>) {
        let command = Command::Incr {
            key: key.to_vec(),
            delta,
        };
        let reply = match self.dispatch(flags, command) {
            Ok(reply) => reply,
            Err(failure) => return (Status::Failed(failure), None),
        };

        match status_of(&reply) {
            Status::Done => match reply.counter_value() {
                Ok(value) => (Status::Done, Some(value)),
                Err(e) => {
                    tracing::warn!("Bad incr reply: {}", e);
                    (Status::Failed(Failure::Malformed), None)
                }
            },
            other => (other, None),
        }
    }

    // =========================================================================
    // Iteration and statistics (first registered endpoint / explicit)
    // =========================================================================

    pub fn primitive_first_key(&self) -> (Status, Option<Vec<u8>>) {
        self.iterate(Command::FirstKey)
    }

    pub fn primitive_next_key(&self, key: &[u8]) -> (Status, Option<Vec<u8>>) {
        self.iterate(Command::NextKey { key: key.to_vec() })
    }

    fn iterate(&self, command: Command) -> (Status, Option<Vec<u8>>) {
        let endpoint = match self.registry.first() {
            Some(endpoint) => endpoint,
            None => return (Status::Failed(Failure::NoEndpoint), None),
        };
        match self.round_trip(&endpoint, Flags::NONE, command) {
            Ok(reply) => with_value(&reply),
            Err(failure) => (Status::Failed(failure), None),
        }
    }

    pub fn primitive_stats(&self, endpoint: &Endpoint) -> (Status, Vec<u64>) {
        let reply = match self.round_trip(endpoint, Flags::NONE, Command::Stats) {
            Ok(reply) => reply,
            Err(failure) => return (Status::Failed(failure), Vec::new()),
        };

        match status_of(&reply) {
            Status::Done => match reply.stats_values() {
                Ok(values) => (Status::Done, values),
                Err(e) => {
                    tracing::warn!("Bad stats reply from {}: {}", endpoint, e);
                    (Status::Failed(Failure::Malformed), Vec::new())
                }
            },
            other => (other, Vec::new()),
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Select an endpoint for the command's key and run one round trip
    fn dispatch(&self, flags: Flags, command: Command) -> Result<Reply, Failure> {
        let endpoint = self
            .registry
            .select(self.policy, command.key())
            .ok_or(Failure::NoEndpoint)?;
        self.round_trip(&endpoint, flags, command)
    }

    fn round_trip(&self, endpoint: &Endpoint, flags: Flags, command: Command) -> Result<Reply, Failure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) & Request::MAX_ID;
        let request = Request::new(id, flags, command);

        tracing::debug!(
            "{:?} (flags {:#x}, id {}) -> {}",
            request.command.command_type(),
            flags.bits(),
            request.id,
            endpoint
        );

        let reply = self.transport.round_trip(endpoint, &request).map_err(|e| {
            tracing::debug!("Round trip to {} failed: {}", endpoint, e);
            Failure::from(&e)
        })?;

        if reply.id != request.id {
            tracing::warn!(
                "Reply id {} from {} does not match request id {}",
                reply.id,
                endpoint,
                request.id
            );
            return Err(Failure::Malformed);
        }

        Ok(reply)
    }
}

/// Map a reply code onto a status
fn status_of(reply: &Reply) -> Status {
    match reply.reply_code() {
        Some(ReplyCode::Ok) | Some(ReplyCode::CacheHit) => Status::Done,
        Some(ReplyCode::CacheMiss) | Some(ReplyCode::NotIn) => Status::Absent,
        Some(ReplyCode::NoMatch) => Status::NoMatch,
        Some(ReplyCode::Error) => match reply.server_error() {
            Ok(error) => Status::Failed(Failure::Server(error)),
            Err(_) => Status::Failed(Failure::Malformed),
        },
        None => {
            tracing::warn!("Reply code 0x{:x} is outside the protocol", reply.code);
            Status::Failed(Failure::UnexpectedReply)
        }
    }
}

/// Status plus the value carried by a successful value reply
fn with_value(reply: &Reply) -> (Status, Option<Vec<u8>>) {
    match status_of(reply) {
        Status::Done => match reply.value_bytes() {
            Ok(value) => (Status::Done, Some(value)),
            Err(e) => {
                tracing::warn!("Bad value reply: {}", e);
                (Status::Failed(Failure::Malformed), None)
            }
        },
        other => (other, None),
    }
}
