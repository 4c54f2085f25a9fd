//! Local stand-in for the speed service, used by the workspace tests.
//!
//! It serves the same four endpoints (`/__down`, `/__up`, `/cdn-cgi/trace`, `/locations`) over
//! plain http on a loopback port and stamps every measurement response with a
//! `Server-Timing: cfRequestDuration;dur=<ms>` header.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bytes::Bytes;
use http_body_util::BodyExt as _;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_DOWN: &str = "/__down";
pub const PATH_UP: &str = "/__up";
pub const PATH_TRACE: &str = "/cdn-cgi/trace";
pub const PATH_LOCATIONS: &str = "/locations";

pub const COLO: &str = "TST";
pub const CITY: &str = "Testville";
pub const COUNTRY: &str = "ZZ";

/// Fault injection and pacing knobs.
#[derive(Debug, Clone, Default)]
pub struct TestServerOptions {
    /// Leave the `Server-Timing` header off every response.
    pub omit_server_timing: bool,
    /// Answer every n-th measurement request (downloads and uploads counted together) with a 500.
    pub fail_every: Option<u64>,
    /// Server processing time added before a download response is sent.
    pub download_delay: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    downloads_total: Arc<AtomicU64>,
    uploads_total: Arc<AtomicU64>,
    upload_bytes_total: Arc<AtomicU64>,
    measurements_total: Arc<AtomicU64>,
}

impl TestServerStats {
    pub fn downloads_total(&self) -> u64 {
        self.downloads_total.load(Ordering::Relaxed)
    }

    pub fn uploads_total(&self) -> u64 {
        self.uploads_total.load(Ordering::Relaxed)
    }

    pub fn upload_bytes_total(&self) -> u64 {
        self.upload_bytes_total.load(Ordering::Relaxed)
    }

    fn next_measurement(&self) -> u64 {
        self.measurements_total.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Debug, Clone)]
struct AppState {
    stats: TestServerStats,
    options: Arc<TestServerOptions>,
}

impl AppState {
    fn should_fail(&self) -> bool {
        let n = self.stats.next_measurement();
        let every = self.options.fail_every.unwrap_or(0);
        every > 0 && n.is_multiple_of(every)
    }

    fn timed(&self, started: Instant, mut res: Response) -> Response {
        if !self.options.omit_server_timing {
            let dur = started.elapsed().as_secs_f64() * 1000.0;
            if let Ok(v) = HeaderValue::from_str(&format!("cfRequestDuration;dur={dur:.3}")) {
                res.headers_mut().insert("server-timing", v);
            }
        }
        res
    }
}

#[derive(Debug, Serialize)]
struct LocationRecord {
    iata: &'static str,
    lat: f64,
    lon: f64,
    cca2: &'static str,
    region: &'static str,
    city: &'static str,
}

async fn handle_down(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    state.stats.downloads_total.fetch_add(1, Ordering::Relaxed);

    if state.should_fail() {
        return state.timed(started, StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }

    let Some(bytes) = query.get("bytes").and_then(|v| v.parse::<usize>().ok()) else {
        return state.timed(started, StatusCode::BAD_REQUEST.into_response());
    };

    if !state.options.download_delay.is_zero() {
        sleep(state.options.download_delay).await;
    }

    let body = Bytes::from(vec![b'0'; bytes]);
    state.timed(started, (StatusCode::OK, body).into_response())
}

async fn handle_up(State(state): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    let started = Instant::now();
    state.stats.uploads_total.fetch_add(1, Ordering::Relaxed);

    let received = match body.collect().await {
        Ok(collected) => collected.to_bytes().len() as u64,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    state
        .stats
        .upload_bytes_total
        .fetch_add(received, Ordering::Relaxed);

    let declared = headers
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared != Some(received) {
        return state.timed(started, StatusCode::LENGTH_REQUIRED.into_response());
    }

    if state.should_fail() {
        return state.timed(started, StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }

    state.timed(started, StatusCode::OK.into_response())
}

async fn handle_trace(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let body = format!(
        "fl=0f0\nh=localhost\nip=127.0.0.1\nts=0.000\nvisit_scheme=http\nuag=speedr\n\
         colo={COLO}\nsliver=none\nhttp=http/1.1\nloc={COUNTRY}\ntls=off\nsni=off\n\
         warp=off\ngateway=off\n"
    );
    state.timed(started, body.into_response())
}

async fn handle_locations(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let records = vec![
        LocationRecord {
            iata: "AAA",
            lat: 0.0,
            lon: 0.0,
            cca2: "AA",
            region: "Nowhere",
            city: "Elsewhere",
        },
        LocationRecord {
            iata: COLO,
            lat: 1.0,
            lon: 1.0,
            cca2: COUNTRY,
            region: "Loopback",
            city: CITY,
        },
    ];

    match serde_json::to_vec(&records) {
        Ok(bytes) => state.timed(
            started,
            ([("content-type", "application/json")], Bytes::from(bytes)).into_response(),
        ),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub fn router(stats: TestServerStats, options: TestServerOptions) -> Router {
    let state = AppState {
        stats,
        options: Arc::new(options),
    };

    Router::new()
        .route(PATH_DOWN, get(handle_down))
        .route(PATH_UP, post(handle_up))
        .route(PATH_TRACE, get(handle_trace))
        .route(PATH_LOCATIONS, get(handle_locations))
        .with_state(state)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerOptions::default()).await
    }

    pub async fn start_with(options: TestServerOptions) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(stats.clone(), options);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
