//! The adaptive "smart" dispatcher (`spec.md` §4.5).
//!
//! Selects lightweight, direct, or chunked wire encoding by payload size
//! on send, and auto-detects the mode on receive from the lead
//! discriminator byte. The chunked path is identical, bit-for-bit, to the
//! plain engine's: [`SmartEngine`] is a thin wrapper over
//! [`crate::chunked`]'s byte-level functions, not a parallel
//! reimplementation, per the §9 design note.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::chunked::{receive_chunked_from_header_len, send_chunked};
use crate::error::{Error, Result};
use crate::serializer::Serializer;
use crate::stats::EngineStats;
use crate::wire::{read_exact, read_i32_be, read_u16_be, write_i32_be, write_u16_be};

/// Payloads strictly below this size use lightweight mode.
pub const LIGHTWEIGHT_MAX: usize = 1_024;

/// Payloads strictly below this size (and at least [`LIGHTWEIGHT_MAX`])
/// use direct mode; at or above it, chunked mode.
pub const DIRECT_MAX: usize = 65_536;

/// Lead byte for lightweight mode.
const MODE_LIGHTWEIGHT: u8 = 0xFF;

/// Lead byte for direct mode.
const MODE_DIRECT: u8 = 0xFE;

fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Send `payload`, choosing lightweight, direct, or chunked mode by size.
///
/// Returns the number of chunks written (always 1 for lightweight/direct
/// mode, since each is a single frame).
///
/// # Errors
///
/// See [`send_chunked`] for the chunked path; lightweight/direct paths
/// surface transport errors and honor `cancel` the same way.
pub(crate) async fn send_smart<W>(
    payload: &[u8],
    writer: &mut W,
    cancel: Option<&CancellationToken>,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    check_cancelled(cancel)?;

    if payload.len() < LIGHTWEIGHT_MAX {
        tracing::trace!(payload_len = payload.len(), "dispatching lightweight mode");
        writer.write_all(&[MODE_LIGHTWEIGHT]).await?;
        write_u16_be(writer, payload.len() as u16).await?;
        writer.write_all(payload).await?;
        writer.flush().await?;
        Ok(1)
    } else if payload.len() < DIRECT_MAX {
        tracing::trace!(payload_len = payload.len(), "dispatching direct mode");
        writer.write_all(&[MODE_DIRECT]).await?;
        write_i32_be(writer, payload.len() as i32).await?;
        writer.write_all(payload).await?;
        writer.flush().await?;
        Ok(1)
    } else {
        tracing::trace!(payload_len = payload.len(), "dispatching chunked mode");
        send_chunked(payload, writer, cancel).await
    }
}

/// Read the lead discriminator byte and dispatch to the matching receive
/// path. Returns the decoded payload and the number of chunks read.
///
/// # Errors
///
/// Returns [`Error::ProtocolViolation`] if a direct-mode length falls
/// outside `0..DIRECT_MAX`, or any error the underlying wire/chunked
/// reads can raise.
pub(crate) async fn receive_smart<R>(
    reader: &mut R,
    cancel: Option<&CancellationToken>,
) -> Result<(Vec<u8>, u64)>
where
    R: AsyncRead + Unpin,
{
    check_cancelled(cancel)?;

    let mode_byte = read_exact(reader, 1).await?[0];
    match mode_byte {
        MODE_LIGHTWEIGHT => {
            let len = read_u16_be(reader).await?;
            let payload = read_exact(reader, len as usize).await?;
            Ok((payload, 1))
        }
        MODE_DIRECT => {
            let len = read_i32_be(reader).await?;
            if len < 0 || len as usize >= DIRECT_MAX {
                return Err(Error::protocol("direct mode length out of range"));
            }
            let payload = read_exact(reader, len as usize).await?;
            Ok((payload, 1))
        }
        lead_byte => {
            let rest = read_exact(reader, 3).await?;
            let header_len = i32::from_be_bytes([lead_byte, rest[0], rest[1], rest[2]]);
            receive_chunked_from_header_len(header_len, reader, cancel).await
        }
    }
}

/// The size-adaptive engine: picks lightweight, direct, or chunked wire
/// encoding automatically (`spec.md` §4.5).
///
/// Its chunked path delegates to the same functions [`crate::chunked::PlainEngine`]
/// uses, so a smart sender's chunked-mode output is readable by a plain
/// receiver, and vice versa, for payloads at or above [`DIRECT_MAX`].
/// Mixing variants for payloads below that threshold is the caller's
/// responsibility, per `spec.md` §6.3.
#[derive(Debug)]
pub struct SmartEngine<V, S> {
    serializer: S,
    stats: EngineStats,
    _marker: PhantomData<fn() -> V>,
}

impl<V, S> SmartEngine<V, S>
where
    S: Serializer<V>,
{
    /// Construct a new smart engine around `serializer`.
    pub fn new(serializer: S) -> Self {
        Self { serializer, stats: EngineStats::default(), _marker: PhantomData }
    }

    /// This engine instance's send/receive counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Encode `value` and send it, dispatching to lightweight, direct, or
    /// chunked mode by its encoded size.
    ///
    /// # Errors
    ///
    /// See [`send_smart`] and [`Serializer::encode`].
    pub async fn send<W>(
        &mut self,
        value: &V,
        transport: &mut W,
        cancel: Option<&CancellationToken>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let payload = self.serializer.encode(value)?;
        let chunk_count = send_smart(&payload, transport, cancel).await?;
        self.stats.record_send(payload.len(), chunk_count);
        Ok(())
    }

    /// Receive a value, auto-detecting the wire mode from its lead byte.
    ///
    /// # Errors
    ///
    /// See [`receive_smart`] and [`Serializer::decode`].
    pub async fn receive<R>(
        &mut self,
        transport: &mut R,
        cancel: Option<&CancellationToken>,
    ) -> Result<V>
    where
        R: AsyncRead + Unpin,
    {
        let (payload, chunk_count) = receive_smart(transport, cancel).await?;
        self.stats.record_receive(payload.len(), chunk_count);
        self.serializer.decode(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::{BytesSerializer, Utf8Serializer};

    #[tokio::test]
    async fn tiny_string_uses_lightweight_mode() {
        let mut sender: SmartEngine<String, _> = SmartEngine::new(Utf8Serializer);
        let message = "Hello HyperionProtocol!".to_string();
        let mut buf = Vec::new();
        sender.send(&message, &mut buf, None).await.unwrap();

        assert_eq!(buf[0], MODE_LIGHTWEIGHT);
        assert_eq!(&buf[1..3], &[0x00, 0x17]);
        assert_eq!(&buf[3..], message.as_bytes());

        let mut receiver: SmartEngine<String, _> = SmartEngine::new(Utf8Serializer);
        let mut cursor = std::io::Cursor::new(buf);
        let received = receiver.receive(&mut cursor, None).await.unwrap();
        assert_eq!(received, message);
    }

    #[tokio::test]
    async fn empty_message_wire_is_three_bytes() {
        let mut sender: SmartEngine<Vec<u8>, _> = SmartEngine::new(BytesSerializer);
        let mut buf = Vec::new();
        sender.send(&Vec::new(), &mut buf, None).await.unwrap();
        assert_eq!(buf, vec![0xFF, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn direct_mode_boundary_at_1024_bytes() {
        let mut sender: SmartEngine<Vec<u8>, _> = SmartEngine::new(BytesSerializer);
        let payload = vec![0xABu8; 1024];
        let mut buf = Vec::new();
        sender.send(&payload, &mut buf, None).await.unwrap();

        assert_eq!(buf[0], MODE_DIRECT);
        assert_eq!(&buf[1..5], &[0x00, 0x00, 0x04, 0x00]);
        assert_eq!(&buf[5..], payload.as_slice());

        let mut receiver: SmartEngine<Vec<u8>, _> = SmartEngine::new(BytesSerializer);
        let mut cursor = std::io::Cursor::new(buf);
        let received = receiver.receive(&mut cursor, None).await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn large_payload_dispatches_to_chunked_mode_with_disjoint_lead_byte() {
        let mut sender: SmartEngine<Vec<u8>, _> = SmartEngine::new(BytesSerializer);
        let payload = vec![0x42u8; DIRECT_MAX + 10];
        let mut buf = Vec::new();
        sender.send(&payload, &mut buf, None).await.unwrap();

        assert_ne!(buf[0], MODE_LIGHTWEIGHT);
        assert_ne!(buf[0], MODE_DIRECT);

        let mut receiver: SmartEngine<Vec<u8>, _> = SmartEngine::new(BytesSerializer);
        let mut cursor = std::io::Cursor::new(buf);
        let received = receiver.receive(&mut cursor, None).await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn two_independent_packets_on_one_stream_receive_in_order() {
        let mut sender: SmartEngine<Vec<u8>, _> = SmartEngine::new(BytesSerializer);
        let first = vec![0x01u8; 10];
        let second = vec![0x02u8; 2_000_000];

        let mut buf = Vec::new();
        sender.send(&first, &mut buf, None).await.unwrap();
        sender.send(&second, &mut buf, None).await.unwrap();

        let mut receiver: SmartEngine<Vec<u8>, _> = SmartEngine::new(BytesSerializer);
        let mut cursor = std::io::Cursor::new(buf);
        let received_first = receiver.receive(&mut cursor, None).await.unwrap();
        let received_second = receiver.receive(&mut cursor, None).await.unwrap();

        assert_eq!(received_first, first);
        assert_eq!(received_second, second);
    }

    #[tokio::test]
    async fn direct_mode_rejects_length_at_or_above_direct_max() {
        let mut buf = vec![MODE_DIRECT];
        write_i32_be(&mut buf, DIRECT_MAX as i32).await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let err = receive_smart(&mut cursor, None).await.unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }
}
