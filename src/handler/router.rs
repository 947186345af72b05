//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation, route matching, and dispatching.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH, HOST, REFERER, SERVER, USER_AGENT};
use hyper::{HeaderMap, Method, Request, Response, Version};
use std::net::SocketAddr;
use std::time::Instant;

use super::auth::redact_query;
use crate::config::{AppState, HealthConfig};
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    /// Host header, or the authority of an absolute-form request target
    pub host: Option<&'a str>,
    pub headers: &'a HeaderMap,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let uri = req.uri();
        let host = req
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| uri.authority().map(hyper::http::uri::Authority::as_str));

        Self {
            method: req.method(),
            path: uri.path(),
            query: uri.query(),
            host,
            headers: req.headers(),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub fn handle_request<B>(
    req: &Request<B>,
    state: &AppState,
    peer_addr: Option<SocketAddr>,
) -> Response<Full<Bytes>> {
    let started = Instant::now();
    let ctx = RequestContext::from_request(req);

    let mut response = dispatch(&ctx, state);

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    let body_bytes = response.body().size_hint().exact().unwrap_or(0);
    if *ctx.method == Method::HEAD {
        response = strip_body(response, body_bytes);
    }

    if state.config.logging.access_log {
        let entry = access_entry(req, &ctx, peer_addr, &response, body_bytes, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    response
}

/// Method gate, health probes, then the route table
fn dispatch(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    match *ctx.method {
        Method::GET | Method::HEAD => {}
        Method::OPTIONS => return http::build_options_response(state.config.http.enable_cors),
        _ => {
            logger::log_warning(&format!("Method not allowed: {} {}", ctx.method, ctx.path));
            return http::build_405_response();
        }
    }

    if let Some(resp) = check_health(ctx.path, &state.config.health) {
        return resp;
    }

    match state.routes.resolve(ctx.host, ctx.path) {
        Some(handler) => handler.get(ctx),
        None => {
            logger::log_debug(&format!("No route for {} {}", ctx.method, ctx.path));
            http::build_404_response()
        }
    }
}

/// Health check endpoints are answered without authentication
fn check_health(path: &str, health: &HealthConfig) -> Option<Response<Full<Bytes>>> {
    if !health.enabled {
        return None;
    }
    if path == health.liveness_path || path == health.readiness_path {
        return Some(http::build_health_response("ok"));
    }
    None
}

/// HEAD answers carry the GET headers with an empty body
fn strip_body(response: Response<Full<Bytes>>, body_bytes: u64) -> Response<Full<Bytes>> {
    let (mut parts, _) = response.into_parts();
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(body_bytes));
    Response::from_parts(parts, Full::new(Bytes::new()))
}

fn access_entry<B>(
    req: &Request<B>,
    ctx: &RequestContext<'_>,
    peer_addr: Option<SocketAddr>,
    response: &Response<Full<Bytes>>,
    body_bytes: u64,
    started: Instant,
) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.map_or_else(|| "-".to_string(), |a| a.ip().to_string()),
        ctx.method.to_string(),
        ctx.path.to_string(),
    );
    entry.query = ctx.query.map(redact_query);
    entry.http_version = version_label(req.version()).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = body_bytes;
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::environment::{EnvSource, EnvironmentInfo, DEFAULT_NOTEBOOK_ICON, NOTEBOOK_TYPE_VAR};
    use crate::handler::setup_handlers;
    use crate::routing::RouteTable;
    use http_body_util::BodyExt;
    use hyper::StatusCode;
    use std::collections::HashMap;
    use std::sync::Arc;

    const TOKEN: &str = "test-token";

    fn state_with_env(env: HashMap<String, String>) -> AppState {
        let mut cfg = Config::from_toml_str(&format!(
            "[auth]\ntoken = \"{TOKEN}\"\n[logging]\naccess_log = false"
        ))
        .unwrap();
        cfg.http.enable_cors = true;

        let mut routes = RouteTable::new();
        let env: Arc<dyn EnvSource> = Arc::new(env);
        setup_handlers(&mut routes, &cfg, env);
        AppState::new(cfg, routes)
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(HOST, "localhost:8888")
            .body(())
            .unwrap()
    }

    fn authed(uri: &str) -> Request<()> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(HOST, "localhost:8888")
            .header("Authorization", format!("token {TOKEN}"))
            .body(())
            .unwrap()
    }

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_env_endpoint_research_scenario() {
        let mut env = HashMap::new();
        env.insert(NOTEBOOK_TYPE_VAR.to_string(), "Research".to_string());
        let state = state_with_env(env);

        let resp = handle_request(&authed("/jupyterlab_apod/env"), &state, None);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "application/json");
        assert_eq!(
            body_string(resp).await,
            format!(r#"{{"notebookType":"Research","iconTypeUrl":"{DEFAULT_NOTEBOOK_ICON}"}}"#)
        );
    }

    #[tokio::test]
    async fn test_env_endpoint_is_idempotent() {
        let state = state_with_env(HashMap::new());

        let first = body_string(handle_request(&authed("/jupyterlab_apod/env"), &state, None)).await;
        let second = body_string(handle_request(&authed("/jupyterlab_apod/env"), &state, None)).await;
        assert_eq!(first, second);

        let parsed: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(
            parsed,
            serde_json::to_value(EnvironmentInfo::lookup(&HashMap::<String, String>::new())).unwrap()
        );
    }

    #[tokio::test]
    async fn test_env_endpoint_requires_token() {
        let state = state_with_env(HashMap::new());

        let resp = handle_request(&get("/jupyterlab_apod/env"), &state, None);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(!body_string(resp).await.contains("notebookType"));

        let resp = handle_request(&get(&format!("/jupyterlab_apod/env?token={TOKEN}")), &state, None);
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_unknown_route_is_404() {
        let state = state_with_env(HashMap::new());
        let resp = handle_request(&authed("/jupyterlab_apod/other"), &state, None);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_method_gate() {
        let state = state_with_env(HashMap::new());

        let post = Request::builder()
            .method(Method::POST)
            .uri("/jupyterlab_apod/env")
            .body(())
            .unwrap();
        assert_eq!(
            handle_request(&post, &state, None).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );

        let options = Request::builder()
            .method(Method::OPTIONS)
            .uri("/jupyterlab_apod/env")
            .body(())
            .unwrap();
        let resp = handle_request(&options, &state, None);
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()["Access-Control-Allow-Origin"], "*");
    }

    #[tokio::test]
    async fn test_head_strips_body_keeps_length() {
        let state = state_with_env(HashMap::new());
        let full = body_string(handle_request(&authed("/jupyterlab_apod/env"), &state, None)).await;

        let head = Request::builder()
            .method(Method::HEAD)
            .uri("/jupyterlab_apod/env")
            .header("Authorization", format!("token {TOKEN}"))
            .body(())
            .unwrap();
        let resp = handle_request(&head, &state, None);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], full.len().to_string().as_str());
        assert!(body_string(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let state = state_with_env(HashMap::new());
        let resp = handle_request(&get("/healthz"), &state, None);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, r#"{"status":"ok"}"#);
    }

    #[test]
    fn test_server_header() {
        let state = state_with_env(HashMap::new());
        let resp = handle_request(&get("/healthz"), &state, None);
        assert_eq!(
            resp.headers()[SERVER],
            state.config.http.server_name.as_str()
        );
    }

    #[test]
    fn test_context_host_from_absolute_uri() {
        let req = Request::builder()
            .uri("http://example.com:8888/jupyterlab_apod/env?a=1")
            .body(())
            .unwrap();
        let ctx = RequestContext::from_request(&req);
        assert_eq!(ctx.host, Some("example.com:8888"));
        assert_eq!(ctx.path, "/jupyterlab_apod/env");
        assert_eq!(ctx.query, Some("a=1"));
    }
}
