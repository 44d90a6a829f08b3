//! Access-Mode Facades
//!
//! Three views over the same primitive protocol, differing only in which
//! primitive each operation binds to.
//!
//! ```text
//!                 set              get         delete             cas         incr
//!   Direct        set              get         delete             cas         incr
//!   Cache         cache_set        cache_get   cache_delete       cache_cas   cache_incr
//!   Synchronous   set_confirmed    get         delete_confirmed   cas         incr
//! ```
//!
//! Synchronous reads are ordinary reads: only writes wait for the database.
//!
//! ## Per call
//! 1. Read the client's encoding (once)
//! 2. Encode key and values
//! 3. Run the bound primitive
//! 4. Interpret the raw status (network failures become errors here)
//! 5. Decode the returned value, or substitute the default on a miss

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::Client;
use crate::codec::{decode_with, encode_with, BincodeCodec, Codec, Encoding};
use crate::error::{ClientError, Result};
use crate::outcome::{
    interpret_cas, interpret_delete, interpret_incr, interpret_read, interpret_write, Swap,
};
use crate::primitive::{PrimitiveClient, Status};

/// Access mode of a facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Best-effort writes, cache-then-database reads
    Direct,

    /// Cache tier only; entries may be evicted at any time
    Cache,

    /// Writes acknowledged after the durable write
    Synchronous,
}

impl Mode {
    /// Primitive table of this mode
    pub fn bindings(&self) -> &'static Bindings {
        match self {
            Mode::Direct => &DIRECT,
            Mode::Cache => &CACHE,
            Mode::Synchronous => &SYNCHRONOUS,
        }
    }
}

type SetFn = fn(&PrimitiveClient, &[u8], &[u8]) -> Status;
type GetFn = fn(&PrimitiveClient, &[u8]) -> (Status, Option<Vec<u8>>);
type DeleteFn = fn(&PrimitiveClient, &[u8]) -> Status;
type CasFn = fn(&PrimitiveClient, &[u8], &[u8], &[u8]) -> i64;
type IncrFn = fn(&PrimitiveClient, &[u8], i64) -> (Status, Option<i64>);

/// The primitives one mode binds its operations to
pub struct Bindings {
    pub set: SetFn,
    pub get: GetFn,
    pub delete: DeleteFn,
    pub cas: CasFn,
    pub incr: IncrFn,
}

pub const DIRECT: Bindings = Bindings {
    set: PrimitiveClient::primitive_set,
    get: PrimitiveClient::primitive_get,
    delete: PrimitiveClient::primitive_delete,
    cas: PrimitiveClient::primitive_cas,
    incr: PrimitiveClient::primitive_incr,
};

pub const CACHE: Bindings = Bindings {
    set: PrimitiveClient::primitive_cache_set,
    get: PrimitiveClient::primitive_cache_get,
    delete: PrimitiveClient::primitive_cache_delete,
    cas: PrimitiveClient::primitive_cache_cas,
    incr: PrimitiveClient::primitive_cache_incr,
};

pub const SYNCHRONOUS: Bindings = Bindings {
    set: PrimitiveClient::primitive_set_confirmed,
    get: PrimitiveClient::primitive_get,
    delete: PrimitiveClient::primitive_delete_confirmed,
    cas: PrimitiveClient::primitive_cas,
    incr: PrimitiveClient::primitive_incr,
};

/// A client viewed through one access mode
pub struct Facade<'a, C: Codec = BincodeCodec> {
    client: &'a Client<C>,
    mode: Mode,
    bindings: &'static Bindings,
}

impl<'a, C: Codec> Facade<'a, C> {
    pub(crate) fn new(client: &'a Client<C>, mode: Mode) -> Self {
        Self {
            client,
            mode,
            bindings: mode.bindings(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Store `value` under `key`
    pub fn set<K, V>(&self, key: &K, value: &V) -> Result<()>
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        let encoding = self.client.encoding();
        let key = self.encode(encoding, key)?;
        let value = self.encode(encoding, value)?;

        interpret_write((self.bindings.set)(self.client.primitives(), &key, &value))
    }

    /// Value under `key`; on a miss the client's default, or `None` when no
    /// default is set
    pub fn get<K, V>(&self, key: &K) -> Result<Option<V>>
    where
        K: Serialize + ?Sized,
        V: DeserializeOwned,
    {
        let encoding = self.client.encoding();
        match self.fetch(encoding, key)? {
            Some(bytes) => Ok(Some(self.decode(encoding, &bytes)?)),
            None => match self.client.default_bytes(encoding) {
                Some(default) => Ok(Some(self.decode(encoding, default)?)),
                None => Ok(None),
            },
        }
    }

    /// Remove `key`; `false` if it was not present
    pub fn delete<K>(&self, key: &K) -> Result<bool>
    where
        K: Serialize + ?Sized,
    {
        let encoding = self.client.encoding();
        let key = self.encode(encoding, key)?;

        interpret_delete((self.bindings.delete)(self.client.primitives(), &key))
    }

    /// Replace the value under `key` with `new` if it currently is `old`
    pub fn cas<K, O, N>(&self, key: &K, old: &O, new: &N) -> Result<Swap>
    where
        K: Serialize + ?Sized,
        O: Serialize + ?Sized,
        N: Serialize + ?Sized,
    {
        let encoding = self.client.encoding();
        let key = self.encode(encoding, key)?;
        let old = self.encode(encoding, old)?;
        let new = self.encode(encoding, new)?;

        let code = (self.bindings.cas)(self.client.primitives(), &key, &old, &new);
        interpret_cas(code).into_result()
    }

    /// Add `delta` to a counter stored as a NUL-terminated decimal string
    /// (raw bytes such as `b"10\0"`); `None` if the key is absent
    pub fn incr<K>(&self, key: &K, delta: i64) -> Result<Option<i64>>
    where
        K: Serialize + ?Sized,
    {
        let encoding = self.client.encoding();
        let key = self.encode(encoding, key)?;

        interpret_incr((self.bindings.incr)(self.client.primitives(), &key, delta))
    }

    /// True if `key` holds a value different from the default
    ///
    /// The comparison is on encoded bytes. A key whose stored value equals
    /// the default is reported as absent: the two cannot be told apart.
    pub fn exists<K>(&self, key: &K) -> Result<bool>
    where
        K: Serialize + ?Sized,
    {
        let encoding = self.client.encoding();
        match self.fetch(encoding, key)? {
            Some(bytes) => Ok(self.client.default_bytes(encoding) != Some(bytes.as_slice())),
            None => Ok(false),
        }
    }

    /// Value under `key`, or `KeyNotFound` on a miss (the default is not
    /// consulted)
    pub fn get_item<K, V>(&self, key: &K) -> Result<V>
    where
        K: Serialize + ?Sized,
        V: DeserializeOwned,
    {
        let encoding = self.client.encoding();
        match self.fetch(encoding, key)? {
            Some(bytes) => self.decode(encoding, &bytes),
            None => Err(ClientError::KeyNotFound),
        }
    }

    /// Same as [`Facade::set`]
    pub fn set_item<K, V>(&self, key: &K, value: &V) -> Result<()>
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        self.set(key, value)
    }

    fn fetch<K>(&self, encoding: Encoding, key: &K) -> Result<Option<Vec<u8>>>
    where
        K: Serialize + ?Sized,
    {
        let key = self.encode(encoding, key)?;
        interpret_read((self.bindings.get)(self.client.primitives(), &key)).into_result()
    }

    fn encode<T: Serialize + ?Sized>(&self, encoding: Encoding, value: &T) -> Result<Vec<u8>> {
        encode_with(self.client.codec(), encoding, value)
    }

    fn decode<T: DeserializeOwned>(&self, encoding: Encoding, bytes: &[u8]) -> Result<T> {
        decode_with(self.client.codec(), encoding, bytes)
    }
}

