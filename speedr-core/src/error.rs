use speedr_http::ErrorClass;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a trial (or a lookup) did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    InvalidRequest,
    Transport,
    Protocol,
    DegenerateInput,
    InvalidConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] speedr_http::Error),

    /// A measurement that would be infinite, negative or NaN.
    #[error("degenerate measurement: {0}")]
    Degenerate(String),

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    #[error("{endpoint} returned http status {status}")]
    MetadataStatus { endpoint: &'static str, status: u16 },

    #[error("failed to decode {endpoint} response: {reason}")]
    MetadataDecode {
        endpoint: &'static str,
        reason: String,
    },
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Http(e) => match e.class() {
                ErrorClass::InvalidRequest => FailureKind::InvalidRequest,
                ErrorClass::Transport => FailureKind::Transport,
                ErrorClass::Protocol => FailureKind::Protocol,
            },
            Self::Degenerate(_) => FailureKind::DegenerateInput,
            Self::InvalidPlan(_) | Self::InvalidBaseUrl(_) => FailureKind::InvalidConfig,
            Self::MetadataStatus { .. } | Self::MetadataDecode { .. } => FailureKind::Protocol,
        }
    }

    /// Transaction step of a transport failure, if any.
    #[must_use]
    pub fn phase(&self) -> Option<speedr_http::Phase> {
        match self {
            Self::Http(e) => e.phase(),
            _ => None,
        }
    }
}
