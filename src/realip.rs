//! geofront-lite/src/realip.rs
//! TCPShield-style RealIP rewriting of the handshake's server-address field.

use crate::handshake::Handshake;
use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in milliseconds, used to stamp a RealIP rewrite.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Rewrites `handshake.server_address` to `<cleared_host>///<client_ip>/<now_ms>`,
/// returning a new handshake with every other field unchanged. Callers are
/// expected to have already checked `hostname::is_real_ip` on the original
/// address and the route's `real_ip` flag before calling this.
pub fn rewrite_real_ip(
    handshake: &Handshake,
    cleared_host: &str,
    client_ip: IpAddr,
    now_ms: u64,
) -> Handshake {
    Handshake {
        server_address: format!("{cleared_host}///{client_ip}/{now_ms}"),
        ..handshake.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::NEXT_STATE_LOGIN;

    #[test]
    fn rewrites_server_address_with_client_ip_and_timestamp() {
        let original = Handshake {
            protocol_version: 763,
            server_address: "play.example.com///oldip/123".to_string(),
            port: 25565,
            next_state: NEXT_STATE_LOGIN,
        };
        let client_ip: IpAddr = "1.2.3.4".parse().unwrap();
        let rewritten = rewrite_real_ip(&original, "play.example.com", client_ip, 1_700_000_000_000);
        assert_eq!(
            rewritten.server_address,
            "play.example.com///1.2.3.4/1700000000000"
        );
        assert_eq!(rewritten.port, original.port);
        assert_eq!(rewritten.protocol_version, original.protocol_version);
        assert_eq!(rewritten.next_state, original.next_state);
    }

    #[test]
    fn handles_ipv6_client_addresses() {
        let original = Handshake {
            protocol_version: 763,
            server_address: "play.example.com///oldip/123".to_string(),
            port: 25565,
            next_state: NEXT_STATE_LOGIN,
        };
        let client_ip: IpAddr = "::1".parse().unwrap();
        let rewritten = rewrite_real_ip(&original, "play.example.com", client_ip, 42);
        assert_eq!(rewritten.server_address, "play.example.com///::1/42");
    }
}
