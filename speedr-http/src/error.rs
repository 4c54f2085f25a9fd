use std::time::Duration;

use crate::server_timing::ServerTimingError;

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Step of a timed transaction. Transport failures report the step they were in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Dns,
    TcpConnect,
    TlsHandshake,
    Handshake,
    FirstByte,
    Body,
}

/// Coarse failure classes used when logging excluded trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    /// The request could not be built (bad URL, bad header, TLS setup).
    InvalidRequest,
    /// The network failed or ran out of time.
    Transport,
    /// The server answered, but not the way the speed service contract says it should.
    Protocol,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("only http:// and https:// URLs are supported: {0}")]
    UnsupportedScheme(String),

    #[error("http request build failed: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("invalid http header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid http header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("tls configuration failed: {0}")]
    TlsConfig(#[from] tokio_rustls::rustls::Error),

    #[error("{phase} failed: {source}")]
    Transport {
        phase: Phase,
        #[source]
        source: BoxError,
    },

    #[error("{phase} timed out after {after:?}")]
    Timeout { phase: Phase, after: Duration },

    #[error("http request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read response body: {0}")]
    BodyRead(#[from] hyper::Error),

    #[error("unexpected http status {0}")]
    Status(u16),

    #[error("bad server-timing header: {0}")]
    ServerTiming(#[from] ServerTimingError),
}

impl Error {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidUrl(_)
            | Self::UnsupportedScheme(_)
            | Self::RequestBuild(_)
            | Self::HeaderName(_)
            | Self::HeaderValue(_)
            | Self::TlsConfig(_) => ErrorClass::InvalidRequest,
            Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::Request(_)
            | Self::BodyRead(_) => ErrorClass::Transport,
            Self::Status(_) | Self::ServerTiming(_) => ErrorClass::Protocol,
        }
    }

    /// The transaction step a transport failure happened in, if known.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Transport { phase, .. } | Self::Timeout { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    pub(crate) fn transport(phase: Phase, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            phase,
            source: source.into(),
        }
    }
}
