use std::net::IpAddr;

use super::{Error, Result};

pub(super) fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

/// Host header value: the port is left out when it is the scheme default.
pub(super) fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

/// Connection target of a transaction URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Target {
    /// Host name without IPv6 brackets (used for DNS and SNI).
    pub host: String,
    /// Set when the URL names an address directly; no lookup happens then.
    pub ip: Option<IpAddr>,
    pub port: u16,
    pub tls: bool,
    pub authority: String,
    pub path_and_query: String,
}

impl Target {
    pub(super) fn parse(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
        let tls = match parsed.scheme() {
            "https" => true,
            "http" => false,
            _ => return Err(Error::UnsupportedScheme(url.to_string())),
        };

        let (host, ip) = match parsed.host() {
            Some(url::Host::Domain(d)) => (d.to_string(), None),
            Some(url::Host::Ipv4(v4)) => (v4.to_string(), Some(IpAddr::V4(v4))),
            Some(url::Host::Ipv6(v6)) => (v6.to_string(), Some(IpAddr::V6(v6))),
            None => return Err(Error::InvalidUrl(url.to_string())),
        };

        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| Error::InvalidUrl(url.to_string()))?;
        let authority =
            host_header_value(&parsed).ok_or_else(|| Error::InvalidUrl(url.to_string()))?;
        let path_and_query =
            parsed[url::Position::BeforePath..url::Position::AfterQuery].to_string();

        Ok(Self {
            host,
            ip,
            port,
            tls,
            authority,
            path_and_query,
        })
    }
}
