//! The serializer plug-in (`spec.md` §4.1/§6.1).
//!
//! The framing engine is monomorphic over opaque byte buffers; it never
//! inspects payload bytes. A [`Serializer`] is how an application value
//! becomes (and comes back from) those bytes. Implementations must be
//! pure — no hidden streaming state — and cheap to construct, since the
//! engine may build one per call.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Converts an application value to and from the byte buffer the framing
/// engine transports.
///
/// Implementations must be safe to use concurrently across independent
/// connections; the engine assumes serializers carry no mutable state of
/// their own.
pub trait Serializer<V> {
    /// Encode `value` to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializerError`] if `value` cannot be encoded.
    fn encode(&self, value: &V) -> Result<Vec<u8>>;

    /// Decode `bytes` back into a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializerError`] if `bytes` cannot be decoded.
    fn decode(&self, bytes: &[u8]) -> Result<V>;
}

/// Identity passthrough for raw byte buffers.
///
/// This is the reference serializer §4.1 describes for buffers that are
/// "raw" already: `encode`/`decode` never fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytesSerializer;

impl Serializer<Vec<u8>> for BytesSerializer {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// Passthrough for UTF-8 text, validated on decode.
///
/// Encoding a `String` never fails (Rust strings are always valid UTF-8);
/// decoding fails with [`Error::SerializerError`] if the bytes aren't
/// valid UTF-8.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Serializer;

impl Serializer<String> for Utf8Serializer {
    fn encode(&self, value: &String) -> Result<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(Error::serializer)
    }
}

/// Structured fallback serializer for any `Serialize + DeserializeOwned`
/// type, via `serde_json`.
///
/// Used when a value isn't already a raw byte buffer or UTF-8 text, per
/// §4.1's "else fall back to structured encoding" clause.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer<V> {
    _marker: std::marker::PhantomData<fn() -> V>,
}

impl<V> JsonSerializer<V> {
    /// Construct a new JSON serializer for `V`.
    #[must_use]
    pub const fn new() -> Self {
        Self { _marker: std::marker::PhantomData }
    }
}

impl<V> Serializer<V> for JsonSerializer<V>
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(Error::serializer)
    }

    fn decode(&self, bytes: &[u8]) -> Result<V> {
        serde_json::from_slice(bytes).map_err(Error::serializer)
    }
}
