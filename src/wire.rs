//! Wire primitives — fixed-width big-endian integer codecs and the
//! exact-read helper every higher-level frame reader is built on.
//!
//! All multi-byte integers on the Hyperion wire are big-endian. Reads use
//! `read_exact`, which loops internally (via `tokio::io::AsyncReadExt`) until
//! exactly the requested number of bytes have arrived, or the peer closes
//! the stream first. A short read is never treated as a partial success —
//! see [`crate::error::Error::EndOfStream`].

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{from_read_exact_err, Result};

/// Read exactly `n` bytes from `reader`, looping over partial reads as
/// needed. Returns [`crate::error::Error::EndOfStream`] if the peer closes
/// before `n` bytes arrive.
pub(crate) async fn read_exact<R>(reader: &mut R, n: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; n];
    reader.read_exact(&mut buf).await.map_err(from_read_exact_err)?;
    Ok(buf)
}

/// Write a `u16` to `writer` in big-endian order.
pub(crate) async fn write_u16_be<W>(writer: &mut W, value: u16) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&value.to_be_bytes()).await?;
    Ok(())
}

/// Write an `i32` to `writer` in big-endian order.
pub(crate) async fn write_i32_be<W>(writer: &mut W, value: i32) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&value.to_be_bytes()).await?;
    Ok(())
}

/// Read a big-endian `u16` from `reader`.
pub(crate) async fn read_u16_be<R>(reader: &mut R) -> Result<u16>
where
    R: AsyncRead + Unpin,
{
    let bytes = read_exact(reader, 2).await?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Read a big-endian `i32` from `reader`.
pub(crate) async fn read_i32_be<R>(reader: &mut R) -> Result<i32>
where
    R: AsyncRead + Unpin,
{
    let bytes = read_exact(reader, 4).await?;
    Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn u16_be_round_trip() {
        let mut buf = Vec::new();
        write_u16_be(&mut buf, 0x1234).await.unwrap();
        assert_eq!(buf, vec![0x12, 0x34]);

        let mut cursor = std::io::Cursor::new(buf);
        let value = read_u16_be(&mut cursor).await.unwrap();
        assert_eq!(value, 0x1234);
    }

    #[tokio::test]
    async fn i32_be_round_trip() {
        let mut buf = Vec::new();
        write_i32_be(&mut buf, 0x0102_0304).await.unwrap();
        assert_eq!(buf, vec![0x01, 0x02, 0x03, 0x04]);

        let mut cursor = std::io::Cursor::new(buf);
        let value = read_i32_be(&mut cursor).await.unwrap();
        assert_eq!(value, 0x0102_0304);
    }

    #[tokio::test]
    async fn read_exact_reports_end_of_stream_on_short_read() {
        let mut cursor = std::io::Cursor::new(vec![0x01, 0x02]);
        let err = read_exact(&mut cursor, 4).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::EndOfStream));
    }
}
