//! Error types for Hyperion.
//!
//! This module provides a unified error type for all Hyperion operations,
//! with one variant per failure kind in the protocol's error taxonomy.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for Hyperion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The unified error type for Hyperion send/receive operations.
///
/// Every failure the engine raises is one of these kinds. All non-cancel
/// failures are fatal to the current packet; the caller decides whether to
/// close the connection. The engine never attempts to consume or skip bytes
/// after a protocol violation.
#[derive(Error, Debug)]
pub enum Error {
    /// Null/unusable transport handle or a configuration value that cannot
    /// produce a valid engine (e.g. a zero chunk size).
    #[error("invalid argument: {0}")]
    ArgumentInvalid(String),

    /// Cancellation was observed at a checkpoint (before a chunk on send,
    /// before a header-length read on receive).
    #[error("operation cancelled")]
    Cancelled,

    /// `read_exact` got a short read: the peer closed the connection
    /// mid-frame. Never reported as a short success.
    #[error("end of stream: peer closed connection mid-frame")]
    EndOfStream,

    /// A header or framing invariant was violated by the peer.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The serializer plug-in rejected an encode or decode call.
    #[error("serializer error: {0}")]
    SerializerError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The underlying transport raised an I/O error other than EOF or
    /// cancellation.
    #[error("transport error: {0}")]
    TransportError(#[from] io::Error),
}

impl Error {
    /// Construct a [`Error::ProtocolViolation`] from a `Display`-able reason.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::ProtocolViolation(reason.into())
    }

    /// Construct a [`Error::ArgumentInvalid`] from a `Display`-able reason.
    pub fn argument(reason: impl Into<String>) -> Self {
        Self::ArgumentInvalid(reason.into())
    }

    /// Construct a [`Error::SerializerError`] wrapping an arbitrary cause.
    pub fn serializer(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::SerializerError(Box::new(cause))
    }

    /// Returns whether this error represents cancellation, as distinct from
    /// all other failure modes (callers often want quiet shutdown on cancel
    /// vs. log-and-close on anything else).
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Translate a `tokio::io::AsyncReadExt::read_exact` failure into the
/// protocol's error taxonomy.
///
/// A short read (the documented `UnexpectedEof` case) is always
/// [`Error::EndOfStream`], never treated as a partial success. Any other
/// I/O failure is a [`Error::TransportError`].
pub(crate) fn from_read_exact_err(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::EndOfStream
    } else {
        Error::TransportError(err)
    }
}
