//! Packet header codec — the per-chunk header used by the chunked framing
//! engine (`spec.md` §4.3/§4.4).
//!
//! Headers are encoded as JSON text for legibility and forward
//! compatibility (`spec.md` §9). The codec is pure: it never touches a
//! transport, only bytes in and structures out.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Maximum payload bytes per chunk (1 MiB).
pub const CHUNK_SIZE: usize = 1_048_576;

/// A chunk header's encoded form must be between 1 and 65,536 bytes.
pub const HEADER_LENGTH_MIN: usize = 1;

/// See [`HEADER_LENGTH_MIN`].
pub const HEADER_LENGTH_MAX: usize = 65_536;

/// Required protocol magic tag.
pub const MAGIC: &str = "TTS";

/// Bit 0 of [`ChunkHeader::flags`]: set iff this is the packet's last chunk.
const FLAG_END_OF_PACKET: u8 = 0x01;

/// Per-chunk header. Shared by every chunk of one packet except for
/// `chunk_number`, `data_length`, and `flags`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHeader {
    /// Must equal `"TTS"`.
    #[serde(rename = "Magic")]
    pub magic: String,
    /// Identical across all chunks of one packet.
    #[serde(rename = "PacketId")]
    pub packet_id: Uuid,
    /// `0 <= chunk_number < total_chunks`; equals the receiver's running
    /// chunk count.
    #[serde(rename = "ChunkNumber")]
    pub chunk_number: i32,
    /// Identical across all chunks of one packet.
    #[serde(rename = "TotalChunks")]
    pub total_chunks: i32,
    /// Bytes of payload following this header, in `0..=CHUNK_SIZE`.
    #[serde(rename = "DataLength")]
    pub data_length: i32,
    /// Bit 0 = end of packet. Other bits reserved, must be zero.
    #[serde(rename = "Flags")]
    pub flags: u8,
}

impl ChunkHeader {
    /// Build the header for chunk `chunk_number` of `total_chunks`, carrying
    /// `data_length` payload bytes.
    #[must_use]
    pub fn new(packet_id: Uuid, chunk_number: i32, total_chunks: i32, data_length: i32) -> Self {
        let flags = if chunk_number == total_chunks - 1 { FLAG_END_OF_PACKET } else { 0 };
        Self { magic: MAGIC.to_string(), packet_id, chunk_number, total_chunks, data_length, flags }
    }

    /// Whether bit 0 of `flags` (end-of-packet) is set.
    #[must_use]
    pub const fn is_end_of_packet(&self) -> bool {
        self.flags & FLAG_END_OF_PACKET != 0
    }

    /// Validate every invariant from `spec.md` §3 that this header alone
    /// (without receiver running state) can check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] on the first invariant violated.
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(Error::protocol("Invalid protocol magic"));
        }
        if self.total_chunks <= 0 {
            return Err(Error::protocol("TotalChunks must be positive"));
        }
        if self.chunk_number < 0 || self.chunk_number >= self.total_chunks {
            return Err(Error::protocol("Chunk received out of order"));
        }
        if self.data_length < 0 || self.data_length as usize > CHUNK_SIZE {
            return Err(Error::protocol("DataLength out of range"));
        }
        let expected_end_flag = self.chunk_number == self.total_chunks - 1;
        if self.is_end_of_packet() != expected_end_flag {
            return Err(Error::protocol("End-of-packet flag disagrees with chunk position"));
        }
        if self.flags & !FLAG_END_OF_PACKET != 0 {
            return Err(Error::protocol("Reserved flag bits must be zero"));
        }
        Ok(())
    }
}

/// Encode a [`ChunkHeader`] to its JSON wire form.
///
/// # Errors
///
/// Returns [`Error::SerializerError`] if JSON encoding fails (it should
/// not, for a well-formed header), or [`Error::ProtocolViolation`] if the
/// encoded form falls outside [`HEADER_LENGTH_MIN`]..=[`HEADER_LENGTH_MAX`].
pub fn encode_header(header: &ChunkHeader) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(header).map_err(Error::serializer)?;
    validate_header_length(bytes.len())?;
    Ok(bytes)
}

/// Decode a [`ChunkHeader`] from its JSON wire form and validate every
/// header-local invariant from `spec.md` §3.
///
/// Unexpected fields are tolerated (forward-compatible); missing required
/// fields fail decode.
///
/// # Errors
///
/// Returns [`Error::ProtocolViolation`] if the bytes aren't valid JSON,
/// are missing a required field, or violate a header invariant.
pub fn decode_header(bytes: &[u8]) -> Result<ChunkHeader> {
    let header: ChunkHeader = serde_json::from_slice(bytes)
        .map_err(|e| Error::protocol(format!("malformed chunk header: {e}")))?;
    header.validate()?;
    Ok(header)
}

/// Enforce `spec.md`'s `HeaderLengthLimit`: `1 <= encoded_header_bytes <= 65536`.
///
/// # Errors
///
/// Returns [`Error::ProtocolViolation`] if `len` is outside that range.
pub fn validate_header_length(len: usize) -> Result<()> {
    if len < HEADER_LENGTH_MIN || len > HEADER_LENGTH_MAX {
        return Err(Error::protocol(format!(
            "header length {len} outside [{HEADER_LENGTH_MIN}, {HEADER_LENGTH_MAX}]"
        )));
    }
    Ok(())
}
