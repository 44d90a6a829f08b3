//! # kvlink
//!
//! Client protocol layer for a networked key-value store with:
//! - Endpoints over TCP, UDP, TIPC and SCTP
//! - Direct, cache-only and synchronous (durable-write) access modes
//! - Compare-and-swap, atomic increment and key iteration
//! - Pluggable value codec with a raw byte mode
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Facade (Direct / Cache / Synchronous)           │
//! │                 encode ─► primitive ─► decode                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Outcome Interpreter                         │
//! │          (Found / NotFound / NetworkFailure, CAS split)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                Primitive Operation Client                    │
//! │            (one request, one attempt, raw status)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Registry   │          │  Transport  │
//!   │  (RwLock)   │          │ (TCP / UDP, │
//!   └─────────────┘          │  in-memory) │
//!                            └──────┬──────┘
//!                                   │
//!                                   ▼
//!                          ┌───────────────┐
//!                          │   Protocol    │
//!                          │ (wire format) │
//!                          └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod registry;
pub mod codec;
pub mod protocol;
pub mod transport;
pub mod primitive;
pub mod outcome;
pub mod facade;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ClientError, Result};
pub use config::{Config, ConfigBuilder};
pub use client::Client;
pub use codec::{BincodeCodec, Codec, Encoding};
pub use facade::{Facade, Mode};
pub use outcome::{CasOutcome, Failure, Outcome, Swap};
pub use primitive::{PrimitiveClient, Status};
pub use registry::{
    Endpoint, SelectionPolicy, TransportKind, DEFAULT_PORT, DEFAULT_TIPC_INSTANCE,
};
pub use transport::{MemoryTransport, SocketTransport, Transport};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvlink
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
