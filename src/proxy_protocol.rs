//! geofront-lite/src/proxy_protocol.rs
//! Writes a binary PROXY protocol v2 header ahead of the Minecraft bytes.

use std::io::Result;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;

/// Builds and writes a PROXY v2 header describing `source` (the real client)
/// and `destination` (the backend's view of its own local address), before
/// any Minecraft bytes. Family (TCPv4 vs TCPv6) is inferred from the address
/// pair by the `ppp` builder.
pub async fn write_proxy_v2_header<W>(
    stream: &mut W,
    source: SocketAddr,
    destination: SocketAddr,
) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let header = ppp::v2::Builder::with_addresses(
        ppp::v2::Version::Two | ppp::v2::Command::Proxy,
        ppp::v2::Protocol::Stream,
        (source, destination),
    )
    .build()
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

    stream.write_all(&header).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emits_the_v2_signature_first() {
        let source: SocketAddr = "1.2.3.4:55555".parse().unwrap();
        let destination: SocketAddr = "10.0.0.2:25566".parse().unwrap();
        let mut out = Vec::new();
        write_proxy_v2_header(&mut out, source, destination)
            .await
            .unwrap();

        const SIGNATURE: [u8; 12] = [
            0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A,
        ];
        assert!(out.len() >= SIGNATURE.len());
        assert_eq!(&out[..SIGNATURE.len()], &SIGNATURE);
    }

    #[tokio::test]
    async fn works_for_ipv6_peers() {
        let source: SocketAddr = "[::1]:55555".parse().unwrap();
        let destination: SocketAddr = "[::2]:25566".parse().unwrap();
        let mut out = Vec::new();
        write_proxy_v2_header(&mut out, source, destination)
            .await
            .unwrap();
        assert!(!out.is_empty());
    }
}
