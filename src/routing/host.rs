//! Host pattern matching module
//!
//! Decides which registered host group a request's Host header belongs to.
//! Supports exact match, wildcard prefix (*.), and catch-all (*).

/// Match precedence of a host pattern against a concrete host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HostMatch {
    Exact,
    Wildcard,
    CatchAll,
}

/// Match a host pattern against the Host header value
///
/// Returns the kind of match so callers can prefer exact over wildcard
/// over catch-all. A missing Host header only matches the catch-all.
pub fn match_host(pattern: &str, host: Option<&str>) -> Option<HostMatch> {
    if pattern == "*" {
        return Some(HostMatch::CatchAll);
    }

    let host = strip_port(host?);

    if pattern.eq_ignore_ascii_case(host) {
        return Some(HostMatch::Exact);
    }

    if pattern.starts_with("*.") && match_wildcard_domain(pattern, host) {
        return Some(HostMatch::Wildcard);
    }

    None
}

/// Strip port from host if present (e.g., "example.com:8080" -> "example.com")
fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal: "[::1]:8888"
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

/// Match wildcard domain pattern (*.example.com)
fn match_wildcard_domain(pattern: &str, host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    // ".example.com" covers any depth of subdomain
    if host.ends_with(&pattern[1..]) {
        return true;
    }

    // The bare domain itself
    host == pattern[2..]
}
