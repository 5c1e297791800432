//! Test utilities for helmsd-client
//!
//! [`TestDaemon`] is an in-process fake of the daemon's control API: the
//! REST surface plus both feeds, served over chunked HTTP and WebSocket on
//! one URL each, with optional bearer-secret enforcement. Tests drive the
//! feeds by pushing frames and can force disconnects to exercise the
//! client's reconnection path.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;

use helmsd_core::{
    ConfigPatch, Connection, ConnectionMetadata, ConnectionsSnapshot, DaemonConfig, DelayResponse,
    LogLevel, LogRecord, Proxy, ProxiesResponse, Rule, RulesResponse, SelectProxyRequest,
};

use crate::endpoint::EndpointOptions;
use crate::error::Result;

/// One frame on a fake feed
#[derive(Debug, Clone)]
enum Frame {
    /// A raw wire line (valid or deliberately malformed JSON)
    Line(String),
    /// Close the current transport connection
    Disconnect,
}

struct TestState {
    secret: Option<String>,
    config: Mutex<DaemonConfig>,
    proxies: Mutex<ProxiesResponse>,
    rules: RulesResponse,
    snapshot: Mutex<ConnectionsSnapshot>,
    selections: Mutex<HashMap<String, String>>,
    closed_connections: Mutex<Vec<String>>,
    logs_tx: broadcast::Sender<Frame>,
    conns_tx: broadcast::Sender<Frame>,
    log_feed_connects: AtomicUsize,
    conn_feed_connects: AtomicUsize,
    version_failures: AtomicUsize,
}

/// A fake control daemon that shuts down when dropped
pub struct TestDaemon {
    pub addr: SocketAddr,
    state: Arc<TestState>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestDaemon {
    /// Start a daemon without a secret
    pub async fn start() -> Result<Self> {
        Self::start_with_secret(None).await
    }

    /// Start a daemon that requires the given bearer secret
    ///
    /// HTTP requests must carry `Authorization: Bearer <secret>`; WebSocket
    /// upgrades may pass `?token=<secret>` instead.
    pub async fn start_with_secret(secret: Option<String>) -> Result<Self> {
        let (logs_tx, _) = broadcast::channel(256);
        let (conns_tx, _) = broadcast::channel(256);

        let state = Arc::new(TestState {
            secret,
            config: Mutex::new(DaemonConfig {
                port: 7890,
                socks_port: 7891,
                mode: "rule".into(),
                log_level: LogLevel::Info,
                ..Default::default()
            }),
            proxies: Mutex::new(default_proxies()),
            rules: default_rules(),
            snapshot: Mutex::new(default_snapshot()),
            selections: Mutex::new(HashMap::new()),
            closed_connections: Mutex::new(Vec::new()),
            logs_tx,
            conns_tx,
            log_feed_connects: AtomicUsize::new(0),
            conn_feed_connects: AtomicUsize::new(0),
            version_failures: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/configs", get(get_configs).patch(patch_configs))
            .route("/version", get(get_version))
            .route("/rules", get(get_rules))
            .route("/proxies", get(get_proxies))
            .route("/proxies/{name}", get(get_proxy).put(select_proxy))
            .route("/proxies/{name}/delay", get(get_delay))
            .route("/providers/proxies", get(get_providers))
            .route("/providers/proxies/{name}", axum::routing::put(update_provider))
            .route("/logs", get(logs_endpoint))
            .route(
                "/connections",
                get(connections_endpoint).delete(close_all_connections),
            )
            .route("/connections/{id}", axum::routing::delete(close_connection))
            .layer(middleware::from_fn_with_state(
                Arc::clone(&state),
                require_auth,
            ))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give the server a moment to start accepting.
        tokio::time::sleep(Duration::from_millis(10)).await;

        Ok(Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Endpoint options pointing at this daemon
    pub fn endpoint_options(&self) -> EndpointOptions {
        EndpointOptions {
            hostname: Some(self.addr.ip().to_string()),
            port: Some(self.addr.port()),
            secret: self.state.secret.clone(),
            protocol: Some("http".into()),
        }
    }

    /// Base URL of the daemon
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Absolute URL of a feed path (e.g. `"logs?level=info"`)
    pub fn feed_url(&self, path: &str) -> url::Url {
        url::Url::parse(&format!("http://{}/{}", self.addr, path)).expect("valid feed URL")
    }

    // ---- feed control -------------------------------------------------------

    /// Push one well-formed log line to every connected log feed
    pub fn push_log(&self, level: LogLevel, payload: &str) {
        let record = LogRecord {
            level,
            payload: payload.to_string(),
        };
        let line = serde_json::to_string(&record).expect("log record serializes");
        let _ = self.state.logs_tx.send(Frame::Line(line));
    }

    /// Push a raw (possibly malformed) line to the log feed
    pub fn push_log_raw(&self, line: &str) {
        let _ = self.state.logs_tx.send(Frame::Line(line.to_string()));
    }

    /// Drop every live log feed transport; the REST surface stays up
    pub fn disconnect_logs(&self) {
        let _ = self.state.logs_tx.send(Frame::Disconnect);
    }

    /// Publish a snapshot: stored for the REST endpoint and pushed to feeds
    pub fn push_snapshot(&self, snapshot: ConnectionsSnapshot) {
        let line = serde_json::to_string(&snapshot).expect("snapshot serializes");
        *self.state.snapshot.lock() = snapshot;
        let _ = self.state.conns_tx.send(Frame::Line(line));
    }

    /// Drop every live connections feed transport
    pub fn disconnect_connections(&self) {
        let _ = self.state.conns_tx.send(Frame::Disconnect);
    }

    /// How many times a log feed transport has connected (any kind)
    pub fn log_feed_connections(&self) -> usize {
        self.state.log_feed_connects.load(Ordering::SeqCst)
    }

    /// How many times a connections feed transport has connected
    pub fn connections_feed_connections(&self) -> usize {
        self.state.conn_feed_connects.load(Ordering::SeqCst)
    }

    // ---- REST observation ---------------------------------------------------

    /// Make the next `n` version probes fail with HTTP 500
    pub fn fail_version_probes(&self, n: usize) {
        self.state.version_failures.store(n, Ordering::SeqCst);
    }

    /// The member last selected for a group, if any
    pub fn selected(&self, group: &str) -> Option<String> {
        self.state.selections.lock().get(group).cloned()
    }

    /// Connection IDs closed via the REST API (`"*"` for close-all)
    pub fn closed_connections(&self) -> Vec<String> {
        self.state.closed_connections.lock().clone()
    }

    /// Replace the served daemon config
    pub fn set_config(&self, config: DaemonConfig) {
        *self.state.config.lock() = config;
    }

    /// Shut the daemon down gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Wait for a condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}

// =============================================================================
// Fixtures
// =============================================================================

fn plain_proxy(name: &str, proxy_type: &str) -> Proxy {
    Proxy {
        name: name.to_string(),
        proxy_type: proxy_type.to_string(),
        history: Vec::new(),
        all: None,
        now: None,
        udp: None,
    }
}

fn default_proxies() -> ProxiesResponse {
    let mut proxies = HashMap::new();
    proxies.insert("DIRECT".to_string(), plain_proxy("DIRECT", "Direct"));
    proxies.insert("jp-1".to_string(), plain_proxy("jp-1", "Shadowsocks"));
    proxies.insert("us-2".to_string(), plain_proxy("us-2", "Shadowsocks"));
    proxies.insert(
        "relay".to_string(),
        Proxy {
            name: "relay".to_string(),
            proxy_type: "Selector".to_string(),
            history: Vec::new(),
            all: Some(vec!["jp-1".to_string(), "us-2".to_string()]),
            now: Some("jp-1".to_string()),
            udp: None,
        },
    );
    ProxiesResponse { proxies }
}

fn default_rules() -> RulesResponse {
    RulesResponse {
        rules: vec![
            Rule {
                rule_type: "DomainSuffix".to_string(),
                payload: "example.com".to_string(),
                proxy: "relay".to_string(),
            },
            Rule {
                rule_type: "Match".to_string(),
                payload: String::new(),
                proxy: "DIRECT".to_string(),
            },
        ],
    }
}

fn default_snapshot() -> ConnectionsSnapshot {
    ConnectionsSnapshot {
        download_total: 2048,
        upload_total: 512,
        connections: vec![Connection {
            id: Uuid::new_v4().to_string(),
            metadata: ConnectionMetadata {
                network: "tcp".to_string(),
                inbound: "HTTPS".to_string(),
                source_ip: "127.0.0.1".to_string(),
                destination_ip: "93.184.216.34".to_string(),
                source_port: "50123".to_string(),
                destination_port: "443".to_string(),
                host: "example.com".to_string(),
            },
            upload: 256,
            download: 1024,
            start: Utc::now(),
            chains: vec!["relay".to_string(), "jp-1".to_string()],
            rule: "DomainSuffix".to_string(),
            rule_payload: "example.com".to_string(),
        }],
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn require_auth(
    State(state): State<Arc<TestState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(secret) = &state.secret {
        let bearer = format!("Bearer {}", secret);
        let header_ok = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == bearer);
        let token = format!("token={}", secret);
        let query_ok = request
            .uri()
            .query()
            .is_some_and(|q| q.split('&').any(|pair| pair == token));

        if !header_ok && !query_ok {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Unauthorized"})),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn get_configs(State(state): State<Arc<TestState>>) -> Json<DaemonConfig> {
    Json(state.config.lock().clone())
}

async fn patch_configs(
    State(state): State<Arc<TestState>>,
    Json(patch): Json<ConfigPatch>,
) -> StatusCode {
    let mut config = state.config.lock();
    if let Some(port) = patch.port {
        config.port = port;
    }
    if let Some(port) = patch.socks_port {
        config.socks_port = port;
    }
    if let Some(port) = patch.mixed_port {
        config.mixed_port = port;
    }
    if let Some(allow) = patch.allow_lan {
        config.allow_lan = allow;
    }
    if let Some(mode) = patch.mode {
        config.mode = mode;
    }
    if let Some(level) = patch.log_level {
        config.log_level = level;
    }
    StatusCode::NO_CONTENT
}

async fn get_version(State(state): State<Arc<TestState>>) -> Response {
    let remaining = state.version_failures.load(Ordering::SeqCst);
    if remaining > 0 {
        state.version_failures.store(remaining - 1, Ordering::SeqCst);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "version unavailable"})),
        )
            .into_response();
    }
    Json(json!({"version": "1.9.0-test", "premium": true})).into_response()
}

async fn get_rules(State(state): State<Arc<TestState>>) -> Json<RulesResponse> {
    Json(state.rules.clone())
}

async fn get_proxies(State(state): State<Arc<TestState>>) -> Json<ProxiesResponse> {
    Json(state.proxies.lock().clone())
}

async fn get_proxy(State(state): State<Arc<TestState>>, Path(name): Path<String>) -> Response {
    match state.proxies.lock().proxies.get(&name) {
        Some(proxy) => Json(proxy.clone()).into_response(),
        None => proxy_not_found(&name),
    }
}

async fn select_proxy(
    State(state): State<Arc<TestState>>,
    Path(group): Path<String>,
    Json(request): Json<SelectProxyRequest>,
) -> Response {
    let mut proxies = state.proxies.lock();
    match proxies.proxies.get_mut(&group) {
        Some(proxy) if proxy.all.is_some() => {
            proxy.now = Some(request.name.clone());
            state.selections.lock().insert(group, request.name);
            StatusCode::NO_CONTENT.into_response()
        }
        Some(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "not a selector group"})),
        )
            .into_response(),
        None => proxy_not_found(&group),
    }
}

async fn get_delay(State(state): State<Arc<TestState>>, Path(name): Path<String>) -> Response {
    if state.proxies.lock().proxies.contains_key(&name) {
        Json(DelayResponse { delay: 42 }).into_response()
    } else {
        proxy_not_found(&name)
    }
}

async fn get_providers(State(state): State<Arc<TestState>>) -> Json<serde_json::Value> {
    let proxies = state.proxies.lock();
    Json(json!({
        "providers": {
            "main": {
                "name": "main",
                "type": "Proxy",
                "vehicleType": "HTTP",
                "proxies": proxies.proxies.values().collect::<Vec<_>>(),
                "updatedAt": Utc::now(),
            }
        }
    }))
}

async fn update_provider(Path(_name): Path<String>) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn close_connection(
    State(state): State<Arc<TestState>>,
    Path(id): Path<String>,
) -> StatusCode {
    let mut snapshot = state.snapshot.lock();
    snapshot.connections.retain(|c| c.id != id);
    state.closed_connections.lock().push(id);
    StatusCode::NO_CONTENT
}

async fn close_all_connections(State(state): State<Arc<TestState>>) -> StatusCode {
    state.snapshot.lock().connections.clear();
    state.closed_connections.lock().push("*".to_string());
    StatusCode::NO_CONTENT
}

fn proxy_not_found(name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": format!("proxy {} not found", name)})),
    )
        .into_response()
}

// =============================================================================
// Feed plumbing
// =============================================================================

async fn logs_endpoint(State(state): State<Arc<TestState>>, request: Request) -> Response {
    let rx = state.logs_tx.subscribe();
    state.log_feed_connects.fetch_add(1, Ordering::SeqCst);
    serve_feed(rx, request).await
}

async fn connections_endpoint(State(state): State<Arc<TestState>>, request: Request) -> Response {
    let wants_snapshot = !is_upgrade(&request)
        && request
            .headers()
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
    if wants_snapshot {
        return Json(state.snapshot.lock().clone()).into_response();
    }

    let rx = state.conns_tx.subscribe();
    state.conn_feed_connects.fetch_add(1, Ordering::SeqCst);
    serve_feed(rx, request).await
}

fn is_upgrade(request: &Request) -> bool {
    request.headers().contains_key(header::UPGRADE)
}

/// Serve one feed over whichever transport the request asks for
async fn serve_feed(rx: broadcast::Receiver<Frame>, request: Request) -> Response {
    if is_upgrade(&request) {
        let (mut parts, _body) = request.into_parts();
        match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(upgrade) => upgrade
                .on_upgrade(move |socket| ws_feed(socket, rx))
                .into_response(),
            Err(rejection) => rejection.into_response(),
        }
    } else {
        http_feed(rx)
    }
}

async fn ws_feed(mut socket: WebSocket, mut rx: broadcast::Receiver<Frame>) {
    loop {
        match rx.recv().await {
            Ok(Frame::Line(line)) => {
                if socket.send(WsMessage::Text(line.into())).await.is_err() {
                    break;
                }
            }
            Ok(Frame::Disconnect) => {
                let _ = socket.send(WsMessage::Close(None)).await;
                break;
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn http_feed(mut rx: broadcast::Receiver<Frame>) -> Response {
    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(Frame::Line(line)) => {
                    yield Ok::<Bytes, std::io::Error>(Bytes::from(line + "\n"));
                }
                Ok(Frame::Disconnect) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
