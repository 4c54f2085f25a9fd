use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};

use super::error::BoxError;
use super::server_timing::{self, DEFAULT_METRIC};
use super::util::{Target, has_header};
use super::{Error, Phase, Result, TimedTransaction, TransactionRequest};

/// Client that opens a fresh connection per transaction and timestamps each step.
///
/// Nothing is pooled: DNS, TCP and TLS are paid by every call, so every transaction reports its
/// own setup phases and never shares a socket with another measurement.
#[derive(Clone)]
pub struct TimedClient {
    tls: TlsConnector,
    server_timing_metric: Arc<str>,
}

impl std::fmt::Debug for TimedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedClient")
            .field("server_timing_metric", &self.server_timing_metric)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: tokio::time::Instant,
    budget: Duration,
}

struct Exchange {
    status: u16,
    headers: http::HeaderMap,
    first_byte_at: Instant,
    completed_at: Instant,
    body_bytes: u64,
}

impl TimedClient {
    pub fn new() -> Result<Self> {
        Self::with_server_timing_metric(DEFAULT_METRIC)
    }

    /// `metric` names the `Server-Timing` entry holding the server processing time.
    pub fn with_server_timing_metric(metric: &str) -> Result<Self> {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self::with_tls_config(config, metric))
    }

    /// Build on a caller-supplied TLS configuration, e.g. one trusting a private root.
    ///
    /// ALPN is pinned to `http/1.1` whatever `config` carries.
    #[must_use]
    pub fn with_tls_config(mut config: ClientConfig, metric: &str) -> Self {
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Self {
            tls: TlsConnector::from(Arc::new(config)),
            server_timing_metric: Arc::from(metric),
        }
    }

    pub async fn execute(&self, req: TransactionRequest) -> Result<TimedTransaction> {
        let target = Target::parse(&req.url)?;
        let request = build_request(&req, &target)?;
        let deadline = req.timeout.map(|budget| Deadline {
            at: tokio::time::Instant::now() + budget,
            budget,
        });

        let started = Instant::now();

        let (addrs, dns_lookup_at) = match target.ip {
            Some(ip) => (vec![SocketAddr::new(ip, target.port)], None),
            None => {
                let lookup = tokio::net::lookup_host((target.host.as_str(), target.port));
                let addrs: Vec<SocketAddr> = within(deadline, Phase::Dns, lookup).await?.collect();
                (addrs, Some(Instant::now()))
            }
        };

        let tcp = within(deadline, Phase::TcpConnect, connect_any(addrs)).await?;
        let tcp_connect_at = Instant::now();
        tcp.set_nodelay(true)
            .map_err(|e| Error::transport(Phase::TcpConnect, e))?;

        let (exchange, tls_handshake_at) = if target.tls {
            let name = ServerName::try_from(target.host.clone())
                .map_err(|_| Error::InvalidUrl(req.url.clone()))?;
            let stream = within(deadline, Phase::TlsHandshake, self.tls.connect(name, tcp)).await?;
            let tls_handshake_at = Instant::now();
            let exchange = round_trip(stream, request, deadline).await?;
            (exchange, Some(tls_handshake_at))
        } else {
            (round_trip(tcp, request, deadline).await?, None)
        };

        if !(200..300).contains(&exchange.status) {
            return Err(Error::Status(exchange.status));
        }
        let server_processing_ms =
            server_timing::from_headers(&exchange.headers, &self.server_timing_metric)?;

        let tx = TimedTransaction {
            started,
            dns_lookup_at,
            tcp_connect_at: Some(tcp_connect_at),
            tls_handshake_at,
            first_byte_at: exchange.first_byte_at,
            completed_at: exchange.completed_at,
            server_processing_ms,
            status: exchange.status,
            body_bytes: exchange.body_bytes,
        };

        tracing::trace!(
            url = %req.url,
            dns = ?tx.dns(),
            connect = ?tx.tcp_connect(),
            tls = ?tx.tls_handshake(),
            ttfb = ?tx.time_to_first_byte(),
            transfer = ?tx.transfer(),
            server_ms = tx.server_processing_ms,
            "transaction complete"
        );

        Ok(tx)
    }
}

fn build_request(req: &TransactionRequest, target: &Target) -> Result<Request<Full<Bytes>>> {
    let mut builder = Request::builder()
        .method(req.method.clone())
        .uri(target.path_and_query.as_str());

    if !has_header(&req.headers, "host") {
        builder = builder.header(http::header::HOST, target.authority.as_str());
    }
    if !has_header(&req.headers, "user-agent") {
        builder = builder.header(
            http::header::USER_AGENT,
            concat!("speedr/", env!("CARGO_PKG_VERSION")),
        );
    }
    if (req.method == http::Method::POST || !req.body.is_empty())
        && !has_header(&req.headers, "content-length")
    {
        builder = builder.header(http::header::CONTENT_LENGTH, req.body.len());
    }

    for (k, v) in &req.headers {
        let name = http::header::HeaderName::from_bytes(k.as_bytes())?;
        let value = http::header::HeaderValue::from_str(v)?;
        builder = builder.header(name, value);
    }

    Ok(builder.body(Full::new(req.body.clone()))?)
}

async fn connect_any(addrs: Vec<SocketAddr>) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }

    match last_err {
        Some(err) => Err(err),
        None => Err(std::io::Error::from(std::io::ErrorKind::NotFound)),
    }
}

/// Send the request over an established stream, then drain the body.
async fn round_trip<S>(
    io: S,
    request: Request<Full<Bytes>>,
    deadline: Option<Deadline>,
) -> Result<Exchange>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let handshake = hyper::client::conn::http1::handshake(TokioIo::new(io));
    let (mut sender, conn) = within(deadline, Phase::Handshake, handshake).await?;
    let conn_task = tokio::spawn(conn);

    let res = within(deadline, Phase::FirstByte, sender.send_request(request)).await;
    let first_byte_at = Instant::now();
    let res = match res {
        Ok(res) => res,
        Err(err) => {
            conn_task.abort();
            return Err(err);
        }
    };

    let (parts, mut body) = res.into_parts();
    let mut body_bytes = 0u64;
    let drained = async {
        loop {
            let next = async { body.frame().await.transpose() };
            let Some(frame) = within(deadline, Phase::Body, next).await? else {
                break;
            };
            if let Some(chunk) = frame.data_ref() {
                body_bytes = body_bytes.saturating_add(chunk.len() as u64);
            }
        }
        Ok::<(), Error>(())
    }
    .await;
    let completed_at = Instant::now();

    drop(sender);
    conn_task.abort();
    drained?;

    Ok(Exchange {
        status: parts.status.as_u16(),
        headers: parts.headers,
        first_byte_at,
        completed_at,
        body_bytes,
    })
}

/// Await one step, mapping its failure (or the deadline running out) onto `phase`.
async fn within<T, E, F>(deadline: Option<Deadline>, phase: Phase, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<BoxError>,
{
    let out = match deadline {
        Some(d) => tokio::time::timeout_at(d.at, fut)
            .await
            .map_err(|_| Error::Timeout {
                phase,
                after: d.budget,
            })?,
        None => fut.await,
    };

    out.map_err(|e| Error::transport(phase, e))
}
