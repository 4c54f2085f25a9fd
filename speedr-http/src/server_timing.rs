//! `Server-Timing` header parsing.
//!
//! Grammar (RFC-style, simplified):
//!
//! ```text
//! header = metric *( "," metric )
//! metric = name *( ";" param )
//! param  = key [ "=" ( token / quoted-string ) ]
//! ```
//!
//! The speed service reports the time it spent on a request as
//! `cfRequestDuration;dur=12.345`. Values are located by delimiter, so a renamed or additional
//! metric never shifts the parsed number.

/// Metric the speed service uses for its request processing time.
pub const DEFAULT_METRIC: &str = "cfRequestDuration";

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    /// `dur` parameter in milliseconds, if present and well-formed.
    pub duration_ms: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServerTimingError {
    #[error("header missing")]
    MissingHeader,

    #[error("header is not valid visible ASCII")]
    NotAscii,

    #[error("empty metric name in {0:?}")]
    EmptyName(String),

    #[error("metric {0:?} not present")]
    MetricNotFound(String),

    #[error("metric {0:?} has no dur parameter")]
    MissingDuration(String),

    #[error("metric {name:?} has invalid dur {value:?}")]
    InvalidDuration { name: String, value: String },
}

/// Parse every metric of a header value.
pub fn parse(value: &str) -> Result<Vec<Metric>, ServerTimingError> {
    let mut metrics = Vec::new();

    for raw in split_unquoted(value, ',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let mut parts = split_unquoted(raw, ';').into_iter();
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(ServerTimingError::EmptyName(raw.to_string()));
        }

        let mut metric = Metric {
            name: name.to_string(),
            duration_ms: None,
            description: None,
        };

        for param in parts {
            let (key, val) = match param.split_once('=') {
                Some((k, v)) => (k.trim(), unquote(v.trim())),
                None => (param.trim(), String::new()),
            };

            if key.eq_ignore_ascii_case("dur") {
                metric.duration_ms = Some(parse_duration(name, &val)?);
            } else if key.eq_ignore_ascii_case("desc") {
                metric.description = Some(val);
            }
        }

        metrics.push(metric);
    }

    Ok(metrics)
}

/// Duration in milliseconds reported for `metric`.
pub fn duration_ms(value: &str, metric: &str) -> Result<f64, ServerTimingError> {
    let found = parse(value)?
        .into_iter()
        .find(|m| m.name == metric)
        .ok_or_else(|| ServerTimingError::MetricNotFound(metric.to_string()))?;

    found
        .duration_ms
        .ok_or(ServerTimingError::MissingDuration(found.name))
}

/// Look up `metric` across every `Server-Timing` header of a response.
pub fn from_headers(headers: &http::HeaderMap, metric: &str) -> Result<f64, ServerTimingError> {
    let mut joined = String::new();
    for v in headers.get_all("server-timing") {
        let v = v.to_str().map_err(|_| ServerTimingError::NotAscii)?;
        if !joined.is_empty() {
            joined.push_str(", ");
        }
        joined.push_str(v);
    }

    if joined.is_empty() {
        return Err(ServerTimingError::MissingHeader);
    }

    duration_ms(&joined, metric)
}

fn parse_duration(name: &str, raw: &str) -> Result<f64, ServerTimingError> {
    let invalid = || ServerTimingError::InvalidDuration {
        name: name.to_string(),
        value: raw.to_string(),
    };

    let v: f64 = raw.parse().map_err(|_| invalid())?;
    if !v.is_finite() || v < 0.0 {
        return Err(invalid());
    }
    Ok(v)
}

fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (idx, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                out.push(&s[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

fn unquote(v: &str) -> String {
    let Some(inner) = v.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return v.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
