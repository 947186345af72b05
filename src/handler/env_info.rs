//! Notebook environment endpoint
//!
//! `GET <base_url>/jupyterlab_apod/env` reports which notebook flavour this
//! server runs and the icon the UI should show for it.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::sync::Arc;

use super::auth::{Authenticated, TokenAuth};
use super::router::RequestContext;
use super::ApiHandler;
use crate::config::Config;
use crate::environment::{EnvSource, EnvironmentInfo};
use crate::http;
use crate::routing::{url_path_join, RouteTable};

/// Namespace the extension's routes live under
pub const EXTENSION_NAMESPACE: &str = "jupyterlab_apod";

/// Host pattern the extension registers for
const ANY_HOST: &str = "*";

pub struct EnvRouteHandler {
    env: Arc<dyn EnvSource>,
}

impl EnvRouteHandler {
    pub fn new(env: Arc<dyn EnvSource>) -> Self {
        Self { env }
    }
}

impl ApiHandler for EnvRouteHandler {
    fn get(&self, _ctx: &RequestContext<'_>) -> Response<Full<Bytes>> {
        // Read on every request, never cached
        let info = EnvironmentInfo::lookup(self.env.as_ref());
        http::json_response(StatusCode::OK, &info)
    }
}

/// Register the extension's routes under the configured base URL
pub fn setup_handlers(table: &mut RouteTable, config: &Config, env: Arc<dyn EnvSource>) {
    let auth = Arc::new(TokenAuth::new(&config.auth));
    let route_pattern = url_path_join(&[config.server.base_url.as_str(), EXTENSION_NAMESPACE, "env"]);

    let handler: Arc<dyn ApiHandler> =
        Arc::new(Authenticated::new(EnvRouteHandler::new(env), auth));

    table.add_handlers(ANY_HOST, vec![(route_pattern, handler)]);
}
