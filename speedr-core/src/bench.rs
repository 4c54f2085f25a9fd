use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use speedr_http::{TimedClient, TimedTransaction, TransactionRequest};

use crate::{Error, Result};

/// Something that performs one instrumented round trip.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        req: TransactionRequest,
    ) -> impl Future<Output = speedr_http::Result<TimedTransaction>> + Send;
}

impl Transport for TimedClient {
    fn execute(
        &self,
        req: TransactionRequest,
    ) -> impl Future<Output = speedr_http::Result<TimedTransaction>> + Send {
        TimedClient::execute(self, req)
    }
}

/// URLs of the speed service endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed =
            url::Url::parse(base_url).map_err(|_| Error::InvalidBaseUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host().is_none() {
            return Err(Error::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn download(&self, bytes: u64) -> String {
        format!("{}/__down?bytes={bytes}", self.base)
    }

    #[must_use]
    pub fn upload(&self) -> String {
        format!("{}/__up", self.base)
    }

    #[must_use]
    pub fn trace(&self) -> String {
        format!("{}/cdn-cgi/trace", self.base)
    }

    #[must_use]
    pub fn locations(&self) -> String {
        format!("{}/locations", self.base)
    }
}

/// Fixed-size download and upload primitives.
#[derive(Debug, Clone)]
pub struct Bench<T> {
    transport: T,
    endpoints: Endpoints,
    timeout: Option<Duration>,
}

impl<T: Transport> Bench<T> {
    pub fn new(transport: T, endpoints: Endpoints, timeout: Option<Duration>) -> Self {
        Self {
            transport,
            endpoints,
            timeout,
        }
    }

    pub async fn download(&self, bytes: u64) -> Result<TimedTransaction> {
        let req =
            TransactionRequest::get(self.endpoints.download(bytes)).with_timeout(self.timeout);
        Ok(self.transport.execute(req).await?)
    }

    /// POST `bytes` zero bytes.
    pub async fn upload(&self, bytes: u64) -> Result<TimedTransaction> {
        let Ok(len) = usize::try_from(bytes) else {
            return Err(Error::Degenerate(format!(
                "upload of {bytes} bytes does not fit in memory"
            )));
        };
        let body = Bytes::from(vec![0u8; len]);

        let req =
            TransactionRequest::post(self.endpoints.upload(), body).with_timeout(self.timeout);
        Ok(self.transport.execute(req).await?)
    }
}

/// Megabits per second for `bytes` moved in `duration_ms` milliseconds.
///
/// Zero, negative and non-finite durations are rejected instead of producing an infinite or
/// negative rate.
pub fn throughput_mbps(bytes: u64, duration_ms: f64) -> Result<f64> {
    if !duration_ms.is_finite() || duration_ms <= 0.0 {
        return Err(Error::Degenerate(format!(
            "cannot compute throughput of {bytes} bytes over {duration_ms} ms"
        )));
    }

    Ok((bytes as f64 * 8.0) / (duration_ms / 1000.0) / 1_000_000.0)
}

/// Network latency of a transaction: time to first byte minus the server's own processing time.
pub fn latency_ms(tx: &TimedTransaction) -> Result<f64> {
    let latency = millis(tx.time_to_first_byte()) - tx.server_processing_ms;
    if latency < 0.0 {
        return Err(Error::Degenerate(format!(
            "server processing time {:.3} ms exceeds time to first byte {:.3} ms",
            tx.server_processing_ms,
            millis(tx.time_to_first_byte())
        )));
    }
    Ok(latency)
}

/// Download rate over the body transfer only (first byte to last byte).
pub fn download_mbps(bytes: u64, tx: &TimedTransaction) -> Result<f64> {
    throughput_mbps(bytes, millis(tx.transfer()))
}

/// Upload rate over the server-reported processing time, i.e. the time it spent receiving.
pub fn upload_mbps(bytes: u64, tx: &TimedTransaction) -> Result<f64> {
    throughput_mbps(bytes, tx.server_processing_ms)
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    fn tx_at(first_byte_ms: u64, completed_ms: u64, server_ms: f64) -> TimedTransaction {
        let base = Instant::now();
        TimedTransaction {
            started: base + Duration::from_millis(100),
            dns_lookup_at: None,
            tcp_connect_at: Some(base + Duration::from_millis(110)),
            tls_handshake_at: None,
            first_byte_at: base + Duration::from_millis(first_byte_ms),
            completed_at: base + Duration::from_millis(completed_ms),
            server_processing_ms: server_ms,
            status: 200,
            body_bytes: 0,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn one_megabyte_per_second_is_eight_mbps() {
        assert!(approx(throughput_mbps(1_000_000, 1000.0).unwrap(), 8.0));
    }

    #[test]
    fn degenerate_durations_are_rejected() {
        for duration_ms in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = throughput_mbps(1, duration_ms).unwrap_err();
            assert!(matches!(err, Error::Degenerate(_)), "{duration_ms}: {err}");
        }
    }

    #[test]
    fn latency_subtracts_server_time() {
        // started=100, first byte=150, server 10ms.
        let tx = tx_at(150, 200, 10.0);
        assert!(approx(latency_ms(&tx).unwrap(), 40.0));
    }

    #[test]
    fn latency_below_zero_is_rejected() {
        let tx = tx_at(150, 200, 75.0);
        let err = latency_ms(&tx).unwrap_err();
        assert!(matches!(err, Error::Degenerate(_)));
    }

    #[test]
    fn download_uses_transfer_window() {
        // first byte at 100, completed at 600: 500ms for 1,001,000 bytes.
        let base = Instant::now();
        let tx = TimedTransaction {
            started: base,
            dns_lookup_at: None,
            tcp_connect_at: None,
            tls_handshake_at: None,
            first_byte_at: base + Duration::from_millis(100),
            completed_at: base + Duration::from_millis(600),
            server_processing_ms: 1.0,
            status: 200,
            body_bytes: 1_001_000,
        };
        assert!(approx(download_mbps(1_001_000, &tx).unwrap(), 16.016));
    }

    #[test]
    fn instantaneous_download_is_degenerate() {
        let tx = tx_at(150, 150, 1.0);
        let err = download_mbps(1000, &tx).unwrap_err();
        assert!(matches!(err, Error::Degenerate(_)));
    }

    #[test]
    fn upload_uses_server_time() {
        let tx = tx_at(150, 4000, 250.0);
        assert!(approx(upload_mbps(1_000_000, &tx).unwrap(), 32.0));
    }

    #[test]
    fn endpoints_follow_service_layout() {
        let e = Endpoints::new("https://speed.cloudflare.com/").unwrap();
        assert_eq!(
            e.download(101_000),
            "https://speed.cloudflare.com/__down?bytes=101000"
        );
        assert_eq!(e.upload(), "https://speed.cloudflare.com/__up");
        assert_eq!(e.trace(), "https://speed.cloudflare.com/cdn-cgi/trace");
        assert_eq!(e.locations(), "https://speed.cloudflare.com/locations");

        assert!(Endpoints::new("speed.cloudflare.com").is_err());
        assert!(Endpoints::new("ftp://speed.cloudflare.com").is_err());
    }

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<TransactionRequest>>,
    }

    impl Transport for Recording {
        async fn execute(&self, req: TransactionRequest) -> speedr_http::Result<TimedTransaction> {
            let tx = tx_at(150, 200, 1.0);
            self.seen.lock().unwrap().push(req);
            Ok(tx)
        }
    }

    #[tokio::test]
    async fn upload_synthesizes_zeroed_body_of_exact_size() {
        let endpoints = Endpoints::new("http://127.0.0.1:9").unwrap();
        let timeout = Some(Duration::from_secs(5));
        let bench = Bench::new(Recording::default(), endpoints, timeout);

        bench.upload(11_000).await.unwrap();
        bench.download(1000).await.unwrap();

        let seen = bench.transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);

        let up = &seen[0];
        assert_eq!(up.method.as_str(), "POST");
        assert_eq!(up.url, "http://127.0.0.1:9/__up");
        assert_eq!(up.body.len(), 11_000);
        assert!(up.body.iter().all(|b| *b == 0));
        assert_eq!(up.timeout, Some(Duration::from_secs(5)));

        let down = &seen[1];
        assert_eq!(down.url, "http://127.0.0.1:9/__down?bytes=1000");
        assert!(down.body.is_empty());
    }
}
