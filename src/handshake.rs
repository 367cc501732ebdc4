//! geofront-lite/src/handshake.rs
//! Minecraft handshake packet: framing, decode, encode.

use crate::varint::{read_varint, read_varint_from_slice, write_varint};
use std::io::{Error, ErrorKind, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Packets larger than this are rejected before any allocation happens, so a
/// client claiming a 10 MiB packet can't make the proxy allocate 10 MiB.
const MAX_PACKET_LEN: i32 = 262144 + 16;
/// Server-address strings can run well past the 255-char wire convention to
/// accommodate Forge (`\0FML\0...`) and RealIP (`///ip/ts`) suffixes.
const MAX_ADDRESS_LEN: usize = 262144;

pub const HANDSHAKE_PACKET_ID: i32 = 0x00;
pub const NEXT_STATE_STATUS: i32 = 1;
pub const NEXT_STATE_LOGIN: i32 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub port: u16,
    pub next_state: i32,
}

/// The decoded handshake plus the exact bytes (packet ID + body, no length
/// prefix) the client sent, so an unmodified handshake can be forwarded
/// byte-for-byte instead of being re-serialized from the parsed form.
#[derive(Clone, Debug)]
pub struct PacketContext {
    pub handshake: Handshake,
    pub packet_id: i32,
    pub payload: Vec<u8>,
}

/// Reads one length-prefixed packet body from the stream (VarInt length,
/// then exactly that many bytes). Returns the raw body, unparsed.
pub async fn read_packet_body<R>(stream: &mut R) -> Result<Vec<u8>>
where
    R: AsyncReadExt + Unpin,
{
    let len = read_varint(stream).await?;
    if len < 0 || len > MAX_PACKET_LEN {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("packet length {len} out of bounds"),
        ));
    }
    let mut body = vec![0u8; len as usize];
    stream.read_exact(&mut body).await?;
    Ok(body)
}

/// Parses a handshake out of an already-buffered packet body, keeping the
/// body itself around as the forwardable payload.
pub fn parse_handshake(body: Vec<u8>) -> Result<PacketContext> {
    let mut offset = 0usize;

    let (packet_id, consumed) = read_varint_from_slice(&body[offset..])?;
    offset += consumed;
    if packet_id != HANDSHAKE_PACKET_ID {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("expected handshake packet id 0x00, got {packet_id:#x}"),
        ));
    }

    let (protocol_version, consumed) = read_varint_from_slice(&body[offset..])?;
    offset += consumed;

    let (addr_len, consumed) = read_varint_from_slice(&body[offset..])?;
    offset += consumed;
    if addr_len < 0 || addr_len as usize > MAX_ADDRESS_LEN {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("server address length {addr_len} exceeds limit"),
        ));
    }
    let addr_len = addr_len as usize;
    let addr_bytes = body
        .get(offset..offset + addr_len)
        .ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "server address truncated"))?;
    let server_address = String::from_utf8(addr_bytes.to_vec())
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
    offset += addr_len;

    let port_bytes = body
        .get(offset..offset + 2)
        .ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "port truncated"))?;
    let port = u16::from_be_bytes([port_bytes[0], port_bytes[1]]);
    offset += 2;

    let (next_state, _) = read_varint_from_slice(&body[offset..])?;

    Ok(PacketContext {
        handshake: Handshake {
            protocol_version,
            server_address,
            port,
            next_state,
        },
        packet_id,
        payload: body,
    })
}

/// Re-encodes a handshake into a fresh payload (packet ID + body, no length
/// prefix) — used only when a rewrite (RealIP) changes the server address.
pub fn encode_handshake(handshake: &Handshake) -> Vec<u8> {
    let mut body = Vec::new();
    write_varint(&mut body, HANDSHAKE_PACKET_ID);
    write_varint(&mut body, handshake.protocol_version);
    write_varint(&mut body, handshake.server_address.len() as i32);
    body.extend_from_slice(handshake.server_address.as_bytes());
    body.extend_from_slice(&handshake.port.to_be_bytes());
    write_varint(&mut body, handshake.next_state);
    body
}

/// Writes `VarInt(len(payload)) || payload` to the stream — the framing a
/// backend expects for any forwarded packet.
pub async fn write_framed_packet<W>(stream: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let mut framed = Vec::with_capacity(payload.len() + 5);
    write_varint(&mut framed, payload.len() as i32);
    framed.extend_from_slice(payload);
    stream.write_all(&framed).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, body.len() as i32);
        out.extend_from_slice(body);
        out
    }

    #[tokio::test]
    async fn round_trips_a_handshake() {
        let handshake = Handshake {
            protocol_version: 763,
            server_address: "play.example.com".to_string(),
            port: 25565,
            next_state: NEXT_STATE_LOGIN,
        };
        let body = encode_handshake(&handshake);
        let wire = frame(&body);
        let mut cursor = std::io::Cursor::new(wire);
        let read_body = read_packet_body(&mut cursor).await.unwrap();
        let ctx = parse_handshake(read_body).unwrap();
        assert_eq!(ctx.handshake, handshake);
    }

    #[test]
    fn preserves_forge_token_in_payload() {
        let handshake = Handshake {
            protocol_version: 47,
            server_address: "example.com\0FML\0".to_string(),
            port: 25565,
            next_state: NEXT_STATE_LOGIN,
        };
        let body = encode_handshake(&handshake);
        let ctx = parse_handshake(body.clone()).unwrap();
        assert_eq!(ctx.payload, body);
        assert_eq!(ctx.handshake.server_address, "example.com\0FML\0");
    }

    #[tokio::test]
    async fn rejects_oversized_length_prefix_without_allocating() {
        let mut oversized = Vec::new();
        write_varint(&mut oversized, 10 * 1024 * 1024);
        let mut cursor = std::io::Cursor::new(oversized);
        let err = read_packet_body(&mut cursor).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_wrong_packet_id() {
        let mut body = Vec::new();
        write_varint(&mut body, 0x01);
        write_varint(&mut body, 0);
        write_varint(&mut body, 0);
        body.extend_from_slice(&0u16.to_be_bytes());
        write_varint(&mut body, 1);
        let err = parse_handshake(body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
