//! geofront-lite/src/backend.rs
//! Picks one backend from a route's set and resolves its `host:port` form.

use crate::route::Route;
use rand::seq::SliceRandom;
use std::io::{Error, ErrorKind, Result};

pub const DEFAULT_PORT: u16 = 25565;

/// Uniformly picks one backend string from the route, then parses it as
/// `host[:port]`, defaulting to `25565` when the port is absent or `0`.
///
/// Returns an error if the backend set is empty (defensive; config loading
/// should already reject this) or the chosen string has no host part.
pub fn select_backend(route: &Route) -> Result<String> {
    let chosen = route
        .backends
        .choose(&mut rand::thread_rng())
        .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "route has no backends"))?;
    resolve_backend(chosen)
}

fn resolve_backend(raw: &str) -> Result<String> {
    let (host, port) = match raw.rsplit_once(':') {
        Some((host, port_str)) if !host.is_empty() => {
            let parsed: u16 = port_str.parse().unwrap_or(0);
            (host, parsed)
        }
        _ => (raw, 0),
    };
    if host.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("backend {raw:?} has no host"),
        ));
    }
    let port = if port == 0 { DEFAULT_PORT } else { port };
    Ok(format!("{host}:{port}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn route(backends: &[&str]) -> Route {
        Route::new(
            vec!["example.com".to_string()],
            backends.iter().map(|s| s.to_string()).collect(),
            false,
            false,
        )
    }

    #[test]
    fn defaults_missing_port() {
        assert_eq!(resolve_backend("10.0.0.1").unwrap(), "10.0.0.1:25565");
    }

    #[test]
    fn defaults_zero_port() {
        assert_eq!(resolve_backend("10.0.0.1:0").unwrap(), "10.0.0.1:25565");
    }

    #[test]
    fn keeps_explicit_port() {
        assert_eq!(resolve_backend("10.0.0.1:25566").unwrap(), "10.0.0.1:25566");
    }

    #[test]
    fn rejects_hostless_backend() {
        assert!(resolve_backend(":25566").is_err());
        assert!(resolve_backend("").is_err());
    }

    #[test]
    fn selection_observes_every_backend_over_many_trials() {
        let route = route(&["10.0.0.3:1", "10.0.0.4:2"]);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.insert(select_backend(&route).unwrap());
        }
        assert!(seen.contains("10.0.0.3:1"));
        assert!(seen.contains("10.0.0.4:2"));
    }
}
