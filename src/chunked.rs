//! The chunked framing engine (`spec.md` §4.4) and the plain (chunked-only)
//! engine built on top of it.
//!
//! The byte-level `send_chunked`/`receive_chunked` functions are the
//! protocol's core: every higher-level engine (plain or smart) delegates
//! its chunked path to them, so the wire format stays bit-identical across
//! variants, per the §9 design note.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::header::{decode_header, encode_header, validate_header_length, ChunkHeader, CHUNK_SIZE};
use crate::serializer::Serializer;
use crate::stats::EngineStats;
use crate::wire::{read_exact, read_i32_be, write_i32_be};

/// Check a cancellation signal at a checkpoint, surfacing
/// [`Error::Cancelled`] if it has fired.
fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Send `payload` as a chunked packet: a fresh `PacketId`, split into
/// `max(1, ceil(len/CHUNK_SIZE))` chunks, each framed as
/// `[i32 BE header_length][header bytes][payload bytes]`. Flushes once at
/// the packet boundary. Returns the number of chunks written.
///
/// # Errors
///
/// Returns [`Error::Cancelled`] if `cancel` fires before a chunk is
/// written, or a transport/header error on I/O or encoding failure. Any
/// failure aborts the packet — there is no partial-packet recovery.
pub(crate) async fn send_chunked<W>(
    payload: &[u8],
    writer: &mut W,
    cancel: Option<&CancellationToken>,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let total_chunks = i32::try_from(std::cmp::max(1, payload.len().div_ceil(CHUNK_SIZE)))
        .map_err(|_| Error::argument("payload too large to chunk"))?;
    let packet_id = Uuid::new_v4();
    tracing::debug!(%packet_id, total_chunks, payload_len = payload.len(), "sending chunked packet");

    for chunk_number in 0..total_chunks {
        check_cancelled(cancel)?;

        let offset = chunk_number as usize * CHUNK_SIZE;
        let size = std::cmp::min(CHUNK_SIZE, payload.len() - offset);
        let header = ChunkHeader::new(packet_id, chunk_number, total_chunks, size as i32);
        let header_bytes = encode_header(&header)?;

        write_i32_be(writer, header_bytes.len() as i32).await?;
        writer.write_all(&header_bytes).await?;
        writer.write_all(&payload[offset..offset + size]).await?;
        tracing::trace!(%packet_id, chunk_number, size, "wrote chunk");
    }

    writer.flush().await?;
    Ok(total_chunks as u64)
}

/// Receive a chunked packet whose first chunk's header length has already
/// been read off the wire (used by the smart dispatcher, which consumes
/// the first `i32 BE` as part of mode detection before handing control
/// back to the chunked engine).
///
/// Runs the `AwaitHeader -> AwaitPayload -> (loop|Done)` portion of the
/// receive state machine described in `spec.md` §4.4: any validation
/// failure or EOF is terminal, with no resynchronization attempted.
pub(crate) async fn receive_chunked_from_header_len<R>(
    first_header_len: i32,
    reader: &mut R,
    cancel: Option<&CancellationToken>,
) -> Result<(Vec<u8>, u64)>
where
    R: AsyncRead + Unpin,
{
    validate_header_length(first_header_len as usize)?;

    let mut received: Vec<Vec<u8>> = Vec::new();
    let mut expected_id: Option<Uuid> = None;
    let mut expected_total: i32 = 0;
    let mut next_header_len = Some(first_header_len);

    loop {
        check_cancelled(cancel)?;

        let header_len = match next_header_len.take() {
            Some(len) => len,
            None => read_i32_be(reader).await?,
        };
        validate_header_length(header_len as usize)?;

        let header_bytes = read_exact(reader, header_len as usize).await?;
        let header = decode_header(&header_bytes)?;

        if let Some(id) = expected_id {
            if header.packet_id != id || header.total_chunks != expected_total {
                return Err(Error::protocol("PacketId or TotalChunks changed mid-packet"));
            }
        } else {
            expected_id = Some(header.packet_id);
            expected_total = header.total_chunks;
            tracing::debug!(packet_id = %header.packet_id, total_chunks = expected_total, "receiving chunked packet");
        }

        if header.chunk_number != received.len() as i32 {
            return Err(Error::protocol("Chunk received out of order"));
        }

        let payload = if header.data_length > 0 {
            read_exact(reader, header.data_length as usize).await?
        } else {
            Vec::new()
        };
        received.push(payload);

        if received.len() as i32 >= expected_total {
            break;
        }
    }

    let chunk_count = received.len() as u64;
    let total_len: usize = received.iter().map(Vec::len).sum();
    let mut buffer = Vec::with_capacity(total_len);
    for payload in received {
        buffer.extend_from_slice(&payload);
    }
    Ok((buffer, chunk_count))
}

/// Receive a full chunked packet from scratch, reading the first header
/// length itself.
///
/// # Errors
///
/// Returns [`Error::EndOfStream`] on a short read, [`Error::ProtocolViolation`]
/// on any invariant violation, or [`Error::Cancelled`] if `cancel` fires
/// before the first header length is read.
pub(crate) async fn receive_chunked<R>(
    reader: &mut R,
    cancel: Option<&CancellationToken>,
) -> Result<(Vec<u8>, u64)>
where
    R: AsyncRead + Unpin,
{
    check_cancelled(cancel)?;
    let header_len = read_i32_be(reader).await?;
    receive_chunked_from_header_len(header_len, reader, cancel).await
}

/// The chunked-only engine: every message, regardless of size, is sent
/// and received as a chunked packet (`spec.md` §4.4).
///
/// Generic over an application value type `V` and the [`Serializer`] that
/// converts it to and from the byte buffers the framing layer transports.
#[derive(Debug)]
pub struct PlainEngine<V, S> {
    serializer: S,
    stats: EngineStats,
    _marker: PhantomData<fn() -> V>,
}

impl<V, S> PlainEngine<V, S>
where
    S: Serializer<V>,
{
    /// Construct a new plain engine around `serializer`.
    pub fn new(serializer: S) -> Self {
        Self { serializer, stats: EngineStats::default(), _marker: PhantomData }
    }

    /// This engine instance's send/receive counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Encode `value` and send it as a chunked packet over `transport`.
    ///
    /// # Errors
    ///
    /// See [`send_chunked`] and [`Serializer::encode`].
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
        let chunk_count = send_chunked(&payload, transport, cancel).await?;
        self.stats.record_send(payload.len(), chunk_count);
        Ok(())
    }

    /// Receive a chunked packet from `transport` and decode it.
    ///
    /// # Errors
    ///
    /// See [`receive_chunked`] and [`Serializer::decode`].
    pub async fn receive<R>(
        &mut self,
        transport: &mut R,
        cancel: Option<&CancellationToken>,
    ) -> Result<V>
    where
        R: AsyncRead + Unpin,
    {
        let (payload, chunk_count) = receive_chunked(transport, cancel).await?;
        self.stats.record_receive(payload.len(), chunk_count);
        self.serializer.decode(&payload)
    }
}
