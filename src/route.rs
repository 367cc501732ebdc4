//! geofront-lite/src/route.rs
//! The immutable route table and the first-match-wins matcher.

/// One configured rule: a non-empty set of host patterns mapped to a
/// non-empty set of backend addresses, plus the two rewrite flags.
///
/// Host patterns are stored lowercased so matching never needs to re-lowercase
/// the configured side on every lookup — only the incoming host is lowercased.
#[derive(Clone, Debug)]
pub struct Route {
    pub hosts: Vec<String>,
    pub backends: Vec<String>,
    pub proxy_protocol: bool,
    pub real_ip: bool,
}

impl Route {
    pub fn new(hosts: Vec<String>, backends: Vec<String>, proxy_protocol: bool, real_ip: bool) -> Self {
        Self {
            hosts: hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect(),
            backends,
            proxy_protocol,
            real_ip,
        }
    }
}

/// An ordered sequence of routes; first match wins. Order is preserved from
/// configuration order and never reshuffled.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}

/// Returns whether a lowercased pattern matches a lowercased host.
///
/// `*` matches anything. `*.suffix` matches the bare `suffix` as well as any
/// proper subdomain of it (`a.suffix`, `a.b.suffix`, ...) — but not a host
/// that merely ends with `suffix` without a dot boundary (`xsuffix`).
fn pattern_matches(pattern: &str, host: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if pattern == host {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return host == suffix || host.ends_with(&format!(".{suffix}"));
    }
    false
}

/// Iterates `routes` in order, and within each route iterates `hosts` in
/// order, returning the first `(pattern, route)` whose pattern matches.
/// `host` must already be cleared (see `hostname::clear_virtual_host`); it is
/// lowercased here for the comparison.
pub fn find_route<'a>(host: &str, routes: &'a RouteTable) -> Option<(&'a str, &'a Route)> {
    let host = host.to_ascii_lowercase();
    for route in routes.iter() {
        for pattern in &route.hosts {
            if pattern_matches(pattern, &host) {
                return Some((pattern.as_str(), route));
            }
        }
    }
    None
}
