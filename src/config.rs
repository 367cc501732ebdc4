//! geofront-lite/src/config.rs
//! Loads the TOML configuration file into a `RouteTable` + timeout, and holds
//! the resulting snapshot behind an `ArcSwap` so every accepted connection
//! can clone a consistent view without ever blocking a concurrent reload.

use crate::route::{Route, RouteTable};
use arc_swap::ArcSwap;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Accepts either a single string or a list of strings in TOML — matches the
/// `host`/`backend` fields, which may be one pattern/address or several.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
struct RouteFile {
    host: OneOrMany,
    backend: OneOrMany,
    #[serde(default)]
    proxy_protocol: bool,
    #[serde(default)]
    real_ip: bool,
}

fn default_connection_timeout_ms() -> u64 {
    5000
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default = "default_connection_timeout_ms")]
    connection_timeout_ms: u64,
    #[serde(default)]
    routes: Vec<RouteFile>,
}

/// The error kinds a config load can fail with: unreadable file, malformed
/// TOML, or a route that violates the "non-empty hosts and backends" invariant.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("route #{index} has no host patterns")]
    EmptyHosts { index: usize },
    #[error("route #{index} has no backends")]
    EmptyBackends { index: usize },
}

/// The immutable `{ routes, connectionTimeoutMillis }` pair a connection
/// reads for its whole lifetime, obtained as one `Arc` clone at accept time.
#[derive(Clone, Debug, Default)]
pub struct ConfigSnapshot {
    pub routes: RouteTable,
    pub connection_timeout_ms: u64,
}

impl ConfigSnapshot {
    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let mut routes = Vec::with_capacity(file.routes.len());
        for (index, route) in file.routes.into_iter().enumerate() {
            let hosts = route.host.into_vec();
            if hosts.is_empty() {
                return Err(ConfigError::EmptyHosts { index });
            }
            let backends = route.backend.into_vec();
            if backends.is_empty() {
                return Err(ConfigError::EmptyBackends { index });
            }
            routes.push(Route::new(hosts, backends, route.proxy_protocol, route.real_ip));
        }
        Ok(Self {
            routes: RouteTable::new(routes),
            connection_timeout_ms: file.connection_timeout_ms,
        })
    }
}

fn parse_str(path: &Path, contents: &str) -> Result<ConfigSnapshot, ConfigError> {
    let file: ConfigFile = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    ConfigSnapshot::from_file(file)
}

/// A hot-swappable handle to the current configuration snapshot. Accept-loop
/// code clones the inner `Arc` once per connection; `reload` atomically
/// installs a new snapshot that only affects connections accepted afterward.
pub struct ConfigHandle {
    path: std::path::PathBuf,
    current: ArcSwap<ConfigSnapshot>,
}

impl ConfigHandle {
    /// Loads the file at `path` for the first time.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = Self::read(&path)?;
        Ok(Self {
            path,
            current: ArcSwap::from_pointee(snapshot),
        })
    }

    fn read(path: &Path) -> Result<ConfigSnapshot, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        parse_str(path, &contents)
    }

    /// Returns an `Arc` clone of the current snapshot — the "configuration
    /// snapshot" a single connection reads for its whole lifetime.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    /// Re-reads the file from disk and swaps it in atomically. On parse
    /// failure the previous snapshot keeps serving; the error is returned for
    /// the caller to log.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let snapshot = Self::read(&self.path)?;
        self.current.store(Arc::new(snapshot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::find_route;

    fn load(toml_src: &str) -> Result<ConfigSnapshot, ConfigError> {
        parse_str(Path::new("<test>"), toml_src)
    }

    #[test]
    fn parses_single_and_multi_value_routes() {
        let snapshot = load(
            r#"
            connection_timeout_ms = 2000

            [[routes]]
            host = "localhost"
            backend = "10.0.0.1:25566"

            [[routes]]
            host = ["a", "b"]
            backend = ["10.0.0.3:1", "10.0.0.4:2"]
            proxy_protocol = true
            real_ip = true
            "#,
        )
        .unwrap();

        assert_eq!(snapshot.connection_timeout_ms, 2000);
        assert_eq!(snapshot.routes.len(), 2);
        let (_, route) = find_route("localhost", &snapshot.routes).unwrap();
        assert_eq!(route.backends, vec!["10.0.0.1:25566".to_string()]);
        let (_, route) = find_route("b", &snapshot.routes).unwrap();
        assert!(route.proxy_protocol);
        assert!(route.real_ip);
    }

    #[test]
    fn defaults_connection_timeout_and_flags() {
        let snapshot = load(
            r#"
            [[routes]]
            host = "*"
            backend = "10.0.0.1"
            "#,
        )
        .unwrap();
        assert_eq!(snapshot.connection_timeout_ms, 5000);
        let (_, route) = find_route("anything", &snapshot.routes).unwrap();
        assert!(!route.proxy_protocol);
        assert!(!route.real_ip);
    }

    #[test]
    fn rejects_route_with_no_hosts() {
        let err = load(
            r#"
            [[routes]]
            host = []
            backend = "10.0.0.1"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyHosts { index: 0 }));
    }

    #[test]
    fn rejects_route_with_no_backends() {
        let err = load(
            r#"
            [[routes]]
            host = "localhost"
            backend = []
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyBackends { index: 0 }));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = load("not valid toml [[[").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
