//! Routing module
//!
//! Provides the routing table extensions register into:
//! - Host pattern matching based on the Host header
//! - Exact path lookup within each host group
//! - URL path joining for building routes under a base URL

mod host;
mod table;

pub use table::{url_path_join, RouteTable};
