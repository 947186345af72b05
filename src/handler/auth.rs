//! Authentication guard module
//!
//! Token check applied by the routing layer before an extension handler runs.
//! Handlers stay unaware of authentication; they are wrapped in
//! [`Authenticated`] when registered.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::AUTHORIZATION;
use hyper::Response;
use std::borrow::Cow;
use std::sync::Arc;

use super::router::RequestContext;
use super::ApiHandler;
use crate::config::AuthConfig;
use crate::http;
use crate::logger;

const TOKEN_PARAM: &str = "token";

/// Shared-token authentication
#[derive(Debug, Clone)]
pub struct TokenAuth {
    enabled: bool,
    token: Option<String>,
}

impl TokenAuth {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            enabled: config.enabled,
            token: config.token.clone().filter(|t| !t.is_empty()),
        }
    }

    /// Whether the request carries the server token
    ///
    /// Accepts `Authorization: token <t>`, `Authorization: Bearer <t>` or a
    /// `token=<t>` query parameter. With no token configured nothing passes.
    pub fn is_authenticated(&self, ctx: &RequestContext<'_>) -> bool {
        if !self.enabled {
            return true;
        }
        let Some(expected) = self.token.as_deref() else {
            return false;
        };

        provided_tokens(ctx).any(|candidate| constant_time_eq(&candidate, expected))
    }
}

/// Tokens offered by the request, header first
///
/// Query values are form-decoded, so `token=a%2Bb` offers `a+b`.
fn provided_tokens<'a>(ctx: &'a RequestContext<'a>) -> impl Iterator<Item = Cow<'a, str>> {
    let from_header = ctx
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().split_once(' '))
        .filter(|(scheme, _)| {
            scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer")
        })
        .map(|(_, token)| Cow::Borrowed(token.trim()));

    let from_query = ctx
        .query
        .into_iter()
        .flat_map(|q| form_urlencoded::parse(q.as_bytes()))
        .filter(|(key, _)| *key == TOKEN_PARAM)
        .map(|(_, value)| value);

    from_header.into_iter().chain(from_query)
}

/// Compares every byte of the longer input, whether or not the lengths match
fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let byte_at = |s: &[u8], i: usize| s.get(i).copied().unwrap_or(0);

    (0..a.len().max(b.len())).fold(a.len() ^ b.len(), |acc, i| {
        acc | usize::from(byte_at(a, i) ^ byte_at(b, i))
    }) == 0
}

/// Replace the value of any `token` query parameter so it never reaches the logs
pub fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| {
            let is_token = form_urlencoded::parse(pair.as_bytes())
                .next()
                .is_some_and(|(key, _)| key == TOKEN_PARAM);
            if is_token {
                format!("{TOKEN_PARAM}=[secret]")
            } else {
                pair.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Handler wrapper that rejects unauthenticated requests with 403
pub struct Authenticated<H> {
    inner: H,
    auth: Arc<TokenAuth>,
}

impl<H: ApiHandler> Authenticated<H> {
    pub const fn new(inner: H, auth: Arc<TokenAuth>) -> Self {
        Self { inner, auth }
    }
}

impl<H: ApiHandler> ApiHandler for Authenticated<H> {
    fn get(&self, ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
        if !self.auth.is_authenticated(ctx) {
            logger::log_warning(&format!("Unauthenticated {} {}", ctx.method, ctx.path));
            return http::build_403_response();
        }
        self.inner.get(ctx)
    }
}
