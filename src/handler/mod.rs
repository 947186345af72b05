//! Request handler module
//!
//! Responsible for request dispatch, the authentication guard, and the
//! extension endpoints registered into the route table.

pub mod auth;
pub mod env_info;
pub mod router;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use router::RequestContext;

// Re-export main entry points
pub use env_info::setup_handlers;
pub use router::handle_request;

/// An endpoint that can be registered in the route table
///
/// Only GET is dispatched to handlers; HEAD reuses it without the body.
pub trait ApiHandler: Send + Sync {
    fn get(&self, ctx: &RequestContext<'_>) -> Response<Full<Bytes>>;
}
