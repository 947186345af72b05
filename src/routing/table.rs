//! Route table module
//!
//! Host-scoped routing table that extensions register their handlers into at startup.

use std::sync::Arc;

use super::host::{match_host, HostMatch};
use crate::handler::ApiHandler;

/// Handlers registered under one host pattern
struct HostGroup {
    host_pattern: String,
    routes: Vec<(String, Arc<dyn ApiHandler>)>,
}

/// Routing table consulted for every request
#[derive(Default)]
pub struct RouteTable {
    groups: Vec<HostGroup>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `(path, handler)` pairs for hosts matching `host_pattern`
    ///
    /// Registering the same host pattern twice extends the existing group;
    /// earlier registrations of a path win over later ones.
    pub fn add_handlers(
        &mut self,
        host_pattern: &str,
        handlers: Vec<(String, Arc<dyn ApiHandler>)>,
    ) {
        if let Some(group) = self
            .groups
            .iter_mut()
            .find(|g| g.host_pattern == host_pattern)
        {
            group.routes.extend(handlers);
            return;
        }

        self.groups.push(HostGroup {
            host_pattern: host_pattern.to_string(),
            routes: handlers,
        });
    }

    /// Find the handler for a request
    ///
    /// Host groups are tried exact first, then wildcard, then catch-all;
    /// within a group paths must match exactly.
    pub fn resolve(&self, host: Option<&str>, path: &str) -> Option<&Arc<dyn ApiHandler>> {
        let mut candidates: Vec<(HostMatch, &HostGroup)> = self
            .groups
            .iter()
            .filter_map(|g| match_host(&g.host_pattern, host).map(|m| (m, g)))
            .collect();
        // Stable sort keeps registration order within the same precedence
        candidates.sort_by_key(|(m, _)| *m);

        candidates.into_iter().find_map(|(_, group)| {
            group
                .routes
                .iter()
                .find(|(route, _)| route == path)
                .map(|(_, handler)| handler)
        })
    }

    /// All registered `(host_pattern, path)` pairs, in registration order
    pub fn routes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.groups.iter().flat_map(|g| {
            g.routes
                .iter()
                .map(move |(path, _)| (g.host_pattern.as_str(), path.as_str()))
        })
    }
}

/// Join URL path pieces with exactly one slash between them
///
/// A leading slash survives if the first piece has one, a trailing slash if
/// the last piece has one. Empty pieces are dropped.
pub fn url_path_join(pieces: &[&str]) -> String {
    let Some(first) = pieces.first() else {
        return String::new();
    };
    let initial = first.starts_with('/');
    let trailing = pieces.last().is_some_and(|p| p.ends_with('/'));

    let mut result = pieces
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if initial {
        result.insert(0, '/');
    }
    if trailing {
        result.push('/');
    }
    if result == "//" {
        result.truncate(1);
    }
    result
}
