//! Client
//!
//! The entry point: owns the endpoint registry, the configuration, the
//! codec and the default value, and hands out access-mode facades.
//!
//! ## Example
//! ```no_run
//! use kvlink::{Client, Config, DEFAULT_PORT};
//!
//! let client = Client::new(Config::default());
//! client.add_tcp("localhost", DEFAULT_PORT)?;
//!
//! let direct = client.direct();
//! direct.set(&1, &2)?;
//! assert_eq!(direct.get::<_, i32>(&1)?, Some(2));
//! # Ok::<(), kvlink::ClientError>(())
//! ```
//!
//! ## Registration
//! ```text
//!   add_tcp / add_udp / add_sctp / add_tipc / register
//!        │
//!        ├─ validate parameters          ──► Config error
//!        ├─ already registered?          ──► AlreadyRegistered
//!        ├─ transport supports the kind? ──► Config error
//!        ├─ transport.prepare()          ──► Config error (unresolvable)
//!        └─ append to registry (unreachable endpoints connect later)
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{decode_with, encode_with, to_raw, BincodeCodec, Codec, Encoding};
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::facade::{Facade, Mode};
use crate::outcome::{interpret_read, interpret_stats};
use crate::primitive::PrimitiveClient;
use crate::registry::{Endpoint, SelectionPolicy};
use crate::transport::{SocketTransport, Transport};

/// Default value substituted on a miss, kept in both encodings
struct DefaultValue {
    /// Codec form
    encoded: Vec<u8>,

    /// Raw form; `None` if the value is not byte-like
    raw: Option<Vec<u8>>,
}

/// A key-value store client
pub struct Client<C: Codec = BincodeCodec> {
    primitives: PrimitiveClient,
    config: Config,
    codec: C,
    default: Option<DefaultValue>,
}

impl Client<BincodeCodec> {
    /// Create a client speaking TCP/UDP over sockets
    pub fn new(config: Config) -> Self {
        let transport = Arc::new(SocketTransport::new(&config));
        Self::with_transport(config, transport)
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self::with_codec(config, transport, BincodeCodec)
    }

    /// Create a client over a custom transport with a default value
    pub fn with_default<T>(config: Config, transport: Arc<dyn Transport>, default: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let mut client = Self::with_transport(config, transport);
        client.set_default(default)?;
        Ok(client)
    }
}

impl<C: Codec> Client<C> {
    /// Create a client with a custom codec
    pub fn with_codec(config: Config, transport: Arc<dyn Transport>, codec: C) -> Self {
        Self {
            primitives: PrimitiveClient::new(transport, config.selection),
            config,
            codec,
            default: None,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    pub fn add_tcp(&self, host: &str, port: u16) -> Result<()> {
        self.register(Endpoint::tcp(host, port))
    }

    pub fn add_udp(&self, host: &str, port: u16) -> Result<()> {
        self.register(Endpoint::udp(host, port))
    }

    pub fn add_sctp(&self, host: &str, port: u16) -> Result<()> {
        self.register(Endpoint::sctp(host, port))
    }

    /// Register a TIPC server by its name instance
    pub fn add_tipc(&self, port: u32) -> Result<()> {
        self.register(Endpoint::tipc(port))
    }

    /// Register an endpoint
    pub fn register(&self, endpoint: Endpoint) -> Result<()> {
        endpoint.validate()?;

        let registry = self.primitives.registry();
        if registry.contains(&endpoint) {
            return Err(ClientError::AlreadyRegistered(endpoint));
        }

        let transport = self.primitives.transport();
        if !transport.supports(endpoint.kind()) {
            return Err(ClientError::Config(format!(
                "unsupported transport kind: {}",
                endpoint.kind()
            )));
        }
        transport.prepare(&endpoint)?;

        registry.register(endpoint.clone())?;
        tracing::info!("Registered endpoint {} ({} total)", endpoint, registry.len());
        Ok(())
    }

    /// Registered endpoints, in registration order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.primitives.registry().list()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Value returned by `get` on a miss
    pub fn set_default<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let encoded = self.codec.encode(value)?;
        let raw = to_raw(value).ok();
        self.default = Some(DefaultValue { encoded, raw });
        Ok(())
    }

    pub fn clear_default(&mut self) {
        self.default = None;
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.config.encoding = encoding;
    }

    pub fn set_selection(&mut self, policy: SelectionPolicy) {
        self.config.selection = policy;
        self.primitives.set_policy(policy);
    }

    // =========================================================================
    // Facades
    // =========================================================================

    pub fn direct(&self) -> Facade<'_, C> {
        self.facade(Mode::Direct)
    }

    pub fn cache(&self) -> Facade<'_, C> {
        self.facade(Mode::Cache)
    }

    pub fn synchronous(&self) -> Facade<'_, C> {
        self.facade(Mode::Synchronous)
    }

    pub fn facade(&self, mode: Mode) -> Facade<'_, C> {
        Facade::new(self, mode)
    }

    // =========================================================================
    // Iteration and statistics
    // =========================================================================

    /// First key in the database of the first registered endpoint
    pub fn first_key<K: DeserializeOwned>(&self) -> Result<Option<K>> {
        let encoding = self.encoding();
        match interpret_read(self.primitives.primitive_first_key()).into_result()? {
            Some(bytes) => Ok(Some(decode_with(&self.codec, encoding, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Key following `key` in the database of the first registered endpoint
    pub fn next_key<Q, K>(&self, key: &Q) -> Result<Option<K>>
    where
        Q: Serialize + ?Sized,
        K: DeserializeOwned,
    {
        let encoding = self.encoding();
        let key = encode_with(&self.codec, encoding, key)?;
        match interpret_read(self.primitives.primitive_next_key(&key)).into_result()? {
            Some(bytes) => Ok(Some(decode_with(&self.codec, encoding, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Counters of every registered endpoint
    pub fn stats(&self) -> Vec<(Endpoint, Result<Vec<u64>>)> {
        self.endpoints()
            .into_iter()
            .map(|endpoint| {
                let counters = interpret_stats(self.primitives.primitive_stats(&endpoint));
                (endpoint, counters)
            })
            .collect()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// The primitive layer (raw statuses, no encoding)
    pub fn primitives(&self) -> &PrimitiveClient {
        &self.primitives
    }

    pub(crate) fn codec(&self) -> &C {
        &self.codec
    }

    pub(crate) fn encoding(&self) -> Encoding {
        self.config.encoding
    }

    /// Encoded default for `encoding`
    pub(crate) fn default_bytes(&self, encoding: Encoding) -> Option<&[u8]> {
        let default = self.default.as_ref()?;
        match encoding {
            Encoding::Auto => Some(default.encoded.as_slice()),
            Encoding::Raw => default.raw.as_deref(),
        }
    }
}
