//! Codec Module
//!
//! Turns application keys and values into the opaque bytes the store keeps,
//! and back.
//!
//! ## Encodings
//! - [`Encoding::Auto`]: everything goes through the client's [`Codec`]
//!   (bincode by default), so any `Serialize` type can be a key or a value
//! - [`Encoding::Raw`]: byte-like values (`&[u8]`, `Vec<u8>`, `[u8; N]`,
//!   `str`, `String`, `u8`) are passed through unchanged; anything else is
//!   a codec error
//!
//! Raw mode exists for interoperating with clients written in other
//! languages, which only agree with us on plain bytes.
//!
//! ## Law
//! For every codec and every value `v` it accepts:
//! `decode(encode(v)) == v`

mod raw;

pub use raw::{from_raw, to_raw};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Encoding policy of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Structured codec
    #[default]
    Auto,

    /// Bytes in, bytes out
    Raw,
}

/// Pluggable structured serializer
///
/// Implementations are stateless; one instance is shared by every call of
/// a client.
pub trait Codec: Send + Sync {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// Default codec: bincode 1.x with its default options
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Encode `value` under `encoding`
pub fn encode_with<C, T>(codec: &C, encoding: Encoding, value: &T) -> Result<Vec<u8>>
where
    C: Codec,
    T: Serialize + ?Sized,
{
    match encoding {
        Encoding::Auto => codec.encode(value),
        Encoding::Raw => to_raw(value),
    }
}

/// Decode `bytes` under `encoding`
pub fn decode_with<C, T>(codec: &C, encoding: Encoding, bytes: &[u8]) -> Result<T>
where
    C: Codec,
    T: DeserializeOwned,
{
    match encoding {
        Encoding::Auto => codec.decode(bytes),
        Encoding::Raw => from_raw(bytes),
    }
}
