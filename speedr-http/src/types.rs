use std::time::{Duration, Instant};

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn body_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request for the pooled metadata client.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: http::Method::GET,
            url: url.to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
            timeout: None,
        }
    }
}

/// One instrumented round trip, executed on a connection of its own.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Deadline for the whole transaction; `None` lets it run to completion.
    pub timeout: Option<Duration>,
}

impl TransactionRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: http::Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Bytes) -> Self {
        Self {
            method: http::Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Phase timestamps of a single transaction.
///
/// Timestamps are non-decreasing in declaration order. Optional phases are `None` when the step
/// did not happen (IP-literal host: no DNS; plain http: no TLS).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedTransaction {
    pub started: Instant,
    pub dns_lookup_at: Option<Instant>,
    pub tcp_connect_at: Option<Instant>,
    pub tls_handshake_at: Option<Instant>,
    pub first_byte_at: Instant,
    pub completed_at: Instant,

    /// Time the server reports it spent producing the response.
    pub server_processing_ms: f64,

    pub status: u16,
    pub body_bytes: u64,
}

impl TimedTransaction {
    /// From start to response head.
    #[must_use]
    pub fn time_to_first_byte(&self) -> Duration {
        self.first_byte_at.saturating_duration_since(self.started)
    }

    /// From response head to end of body.
    #[must_use]
    pub fn transfer(&self) -> Duration {
        self.completed_at.saturating_duration_since(self.first_byte_at)
    }

    #[must_use]
    pub fn total(&self) -> Duration {
        self.completed_at.saturating_duration_since(self.started)
    }

    #[must_use]
    pub fn dns(&self) -> Option<Duration> {
        self.dns_lookup_at
            .map(|at| at.saturating_duration_since(self.started))
    }

    #[must_use]
    pub fn tcp_connect(&self) -> Option<Duration> {
        let from = self.dns_lookup_at.unwrap_or(self.started);
        self.tcp_connect_at
            .map(|at| at.saturating_duration_since(from))
    }

    #[must_use]
    pub fn tls_handshake(&self) -> Option<Duration> {
        let from = self.tcp_connect_at?;
        self.tls_handshake_at
            .map(|at| at.saturating_duration_since(from))
    }
}
