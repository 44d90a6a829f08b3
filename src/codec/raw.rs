//! Raw byte encoding
//!
//! A serde data format that only knows bytes. Strings are written as their
//! UTF-8 bytes, byte sequences (slices, vectors, arrays) as themselves, a
//! lone `u8` as one byte. Nothing is added: no length, no terminator, so a
//! value containing NUL or newline bytes survives byte-exact.

use serde::de::{self, DeserializeOwned, Visitor};
use serde::ser::{self, Impossible, Serialize};

use crate::error::{ClientError, Result};

/// Encode a byte-like value as raw bytes
pub fn to_raw<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut serializer = RawSerializer {
        out: Vec::new(),
        in_seq: false,
    };
    value.serialize(&mut serializer)?;
    Ok(serializer.out)
}

/// Decode raw bytes into a byte-like value
pub fn from_raw<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    T::deserialize(RawDeserializer { input: bytes })
}

fn unsupported(what: &str) -> ClientError {
    ClientError::Codec(format!(
        "raw encoding accepts bytes and strings only, got {}",
        what
    ))
}

// =============================================================================
// Serializer
// =============================================================================

struct RawSerializer {
    out: Vec<u8>,
    /// Inside a byte sequence only single bytes are allowed
    in_seq: bool,
}

impl RawSerializer {
    fn top_level(&self, what: &str) -> Result<()> {
        if self.in_seq {
            Err(unsupported(what))
        } else {
            Ok(())
        }
    }
}

impl<'a> ser::Serializer for &'a mut RawSerializer {
    type Ok = ();
    type Error = ClientError;

    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Impossible<(), ClientError>;
    type SerializeTupleVariant = Impossible<(), ClientError>;
    type SerializeMap = Impossible<(), ClientError>;
    type SerializeStruct = Impossible<(), ClientError>;
    type SerializeStructVariant = Impossible<(), ClientError>;

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.out.push(v);
        Ok(())
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.top_level("a nested string")?;
        self.out.extend_from_slice(v.as_bytes());
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.serialize_str(v.encode_utf8(&mut buf))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.top_level("nested bytes")?;
        self.out.extend_from_slice(v);
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self> {
        self.top_level("a nested sequence")?;
        self.in_seq = true;
        Ok(self)
    }

    fn serialize_tuple(self, len: usize) -> Result<Self> {
        self.serialize_seq(Some(len))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<()> {
        Err(unsupported("bool"))
    }

    fn serialize_i8(self, _v: i8) -> Result<()> {
        Err(unsupported("i8"))
    }

    fn serialize_i16(self, _v: i16) -> Result<()> {
        Err(unsupported("i16"))
    }

    fn serialize_i32(self, _v: i32) -> Result<()> {
        Err(unsupported("i32"))
    }

    fn serialize_i64(self, _v: i64) -> Result<()> {
        Err(unsupported("i64"))
    }

    fn serialize_u16(self, _v: u16) -> Result<()> {
        Err(unsupported("u16"))
    }

    fn serialize_u32(self, _v: u32) -> Result<()> {
        Err(unsupported("u32"))
    }

    fn serialize_u64(self, _v: u64) -> Result<()> {
        Err(unsupported("u64"))
    }

    fn serialize_f32(self, _v: f32) -> Result<()> {
        Err(unsupported("f32"))
    }

    fn serialize_f64(self, _v: f64) -> Result<()> {
        Err(unsupported("f64"))
    }

    fn serialize_none(self) -> Result<()> {
        Err(unsupported("None"))
    }

    fn serialize_unit(self) -> Result<()> {
        Err(unsupported("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<()> {
        Err(unsupported(name))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        Err(unsupported(name))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        Err(unsupported(name))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(unsupported(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(unsupported(name))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(unsupported("a map"))
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(unsupported(name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(unsupported(name))
    }
}

impl<'a> ser::SerializeSeq for &'a mut RawSerializer {
    type Ok = ();
    type Error = ClientError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        self.in_seq = false;
        Ok(())
    }
}

impl<'a> ser::SerializeTuple for &'a mut RawSerializer {
    type Ok = ();
    type Error = ClientError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<()> {
        self.in_seq = false;
        Ok(())
    }
}

// =============================================================================
// Deserializer
// =============================================================================

struct RawDeserializer<'a> {
    input: &'a [u8],
}

impl<'a> RawDeserializer<'a> {
    fn visit_bytes_seq<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let mut seq = de::value::SeqDeserializer::<_, ClientError>::new(
            self.input.iter().copied(),
        );
        let value = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(value)
    }
}

impl<'de, 'a> de::Deserializer<'de> for RawDeserializer<'a> {
    type Error = ClientError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_byte_buf(self.input.to_vec())
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.input {
            [byte] => visitor.visit_u8(*byte),
            other => Err(ClientError::Codec(format!(
                "expected a single byte, got {} bytes",
                other.len()
            ))),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match String::from_utf8(self.input.to_vec()) {
            Ok(s) => visitor.visit_string(s),
            Err(e) => Err(ClientError::Codec(format!("value is not UTF-8: {}", e))),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_byte_buf(self.input.to_vec())
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.visit_bytes_seq(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.visit_bytes_seq(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u16 u32 u64 u128 f32 f64 char
        unit unit_struct tuple_struct map struct enum identifier ignored_any
    }
}
