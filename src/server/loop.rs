// Server loop module
// Accepts connections until shutdown is requested, then drains in-flight ones

use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::shutdown::drain_connections;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop on `listener` until `state.shutdown` fires.
///
/// The listener is closed as soon as shutdown is requested. Open connections
/// are told to finish their current request and close, and get up to
/// `performance.shutdown_grace` seconds to do so.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(listener: TcpListener, state: Arc<AppState>) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            _ = state.shutdown.notified() => break,
        }
    }

    drop(listener);
    state.closing.send_replace(true);
    drain_connections(&state).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::environment::{DEFAULT_NOTEBOOK_ICON, NOTEBOOK_TYPE_VAR};
    use crate::handler::setup_handlers;
    use crate::routing::RouteTable;
    use crate::server::create_reusable_listener;
    use http_body_util::{BodyExt, Empty};
    use hyper::body::Bytes;
    use hyper::{Request, StatusCode};
    use hyper_util::client::legacy::Client;
    use hyper_util::rt::TokioExecutor;
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_serves_env_endpoint_then_shuts_down() {
        let cfg = Config::from_toml_str(
            "[auth]\ntoken = \"t0k\"\n[logging]\naccess_log = false\n[performance]\nshutdown_grace = 1",
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert(NOTEBOOK_TYPE_VAR.to_string(), "Research".to_string());
        let mut routes = RouteTable::new();
        setup_handlers(&mut routes, &cfg, Arc::new(env));

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(AppState::new(cfg, routes));
        let server = tokio::spawn(start_server_loop(listener, Arc::clone(&state)));

        let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();

        let req = Request::get(format!("http://{addr}/jupyterlab_apod/env"))
            .header("Authorization", "token t0k")
            .body(Empty::new())
            .unwrap();
        let resp = client.request(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["notebookType"], "Research");
        assert_eq!(body["iconTypeUrl"], DEFAULT_NOTEBOOK_ICON);

        let req = Request::get(format!("http://{addr}/jupyterlab_apod/env"))
            .body(Empty::new())
            .unwrap();
        let resp = client.request(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        drop(client);
        state.shutdown.notify_one();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_keep_alive_connection_closed_on_shutdown() {
        let cfg = Config::from_toml_str(
            "[auth]\nenabled = false\n[logging]\naccess_log = false\n[performance]\nshutdown_grace = 30",
        )
        .unwrap();
        let state = Arc::new(AppState::new(cfg, RouteTable::new()));

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(start_server_loop(listener, Arc::clone(&state)));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut buf = [0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"HTTP/1.1 200"));
        assert_eq!(state.active_connections.load(Ordering::SeqCst), 1);

        state.shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("idle connection held shutdown open")
            .unwrap();
        assert_eq!(state.active_connections.load(Ordering::SeqCst), 0);
    }
}
