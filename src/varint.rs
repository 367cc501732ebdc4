//! geofront-lite/src/varint.rs
//! Minecraft VarInt codec: 7 bits per byte, MSB continuation, little-endian.

use std::io::{Error, ErrorKind, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const MAX_VARINT_BYTES: u32 = 5;

/// Reads a VarInt (max 5 bytes) from the provided stream.
pub async fn read_varint<R>(stream: &mut R) -> Result<i32>
where
    R: AsyncReadExt + Unpin,
{
    let mut num_read: u32 = 0;
    let mut result: i32 = 0;
    loop {
        if num_read >= MAX_VARINT_BYTES {
            return Err(Error::new(ErrorKind::InvalidData, "VarInt too big"));
        }
        let byte = stream.read_u8().await?;
        let value = (byte & 0x7F) as i32;
        result |= value << (7 * num_read);
        num_read += 1;
        if (byte & 0x80) == 0 {
            break;
        }
    }
    Ok(result)
}

/// Reads a VarInt from an already-buffered slice, returning the value and the
/// number of bytes consumed.
pub fn read_varint_from_slice(buf: &[u8]) -> Result<(i32, usize)> {
    let mut num_read: u32 = 0;
    let mut result: i32 = 0;
    loop {
        if num_read >= MAX_VARINT_BYTES {
            return Err(Error::new(ErrorKind::InvalidData, "VarInt too big"));
        }
        let byte = *buf
            .get(num_read as usize)
            .ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "VarInt truncated"))?;
        let value = (byte & 0x7F) as i32;
        result |= value << (7 * num_read);
        num_read += 1;
        if (byte & 0x80) == 0 {
            break;
        }
    }
    Ok((result, num_read as usize))
}

/// Writes a VarInt into the buffer.
pub fn write_varint(buf: &mut Vec<u8>, mut value: i32) {
    loop {
        if (value & !0x7F) == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push(((value & 0x7F) | 0x80) as u8);
        value = ((value as u32) >> 7) as i32;
    }
}

/// Writes a VarInt directly to an async writer.
pub async fn write_varint_async<W>(stream: &mut W, value: i32) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let mut buf = Vec::with_capacity(5);
    write_varint(&mut buf, value);
    stream.write_all(&buf).await
}
