use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use speedr_http::{HttpClient, HttpRequest, HttpResponse};

use crate::{Endpoints, Error, Result};

/// Label used when a lookup failed or a field was missing.
pub const UNKNOWN_LABEL: &str = "unknown";

/// One record of the service's `/locations` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Location {
    #[serde(rename = "iata", alias = "code")]
    pub code: String,
    pub city: String,
}

/// Parsed `/cdn-cgi/trace` response: one `key=value` pair per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    fields: BTreeMap<String, String>,
}

impl Trace {
    pub fn parse(text: &str) -> Self {
        let fields = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Caller's public address.
    pub fn ip(&self) -> Option<&str> {
        self.get("ip")
    }

    /// Caller's country code.
    pub fn loc(&self) -> Option<&str> {
        self.get("loc")
    }

    /// Code of the data center that answered.
    pub fn colo(&self) -> Option<&str> {
        self.get("colo")
    }

    /// `"<ip> (<loc>)"`.
    pub fn your_ip_label(&self) -> String {
        format!(
            "{} ({})",
            self.ip().unwrap_or(UNKNOWN_LABEL),
            self.loc().unwrap_or(UNKNOWN_LABEL)
        )
    }

    /// `"<city> (<colo>)"`, with the city looked up by colo code.
    pub fn server_location_label(&self, locations: &[Location]) -> String {
        let Some(colo) = self.colo() else {
            return UNKNOWN_LABEL.to_string();
        };

        match locations.iter().find(|l| l.code == colo) {
            Some(l) => format!("{} ({colo})", l.city),
            None => format!("{UNKNOWN_LABEL} ({colo})"),
        }
    }
}

/// Source of the server and caller metadata.
pub trait Directory: Send + Sync {
    fn locations(&self) -> impl Future<Output = Result<Vec<Location>>> + Send;
    fn trace(&self) -> impl Future<Output = Result<Trace>> + Send;
}

/// [`Directory`] backed by the speed service's own endpoints.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: HttpClient,
    endpoints: Endpoints,
    timeout: Option<Duration>,
}

impl HttpDirectory {
    pub fn new(client: HttpClient, endpoints: Endpoints, timeout: Option<Duration>) -> Self {
        Self {
            client,
            endpoints,
            timeout,
        }
    }

    async fn fetch(&self, endpoint: &'static str, url: String) -> Result<HttpResponse> {
        let mut req = HttpRequest::get(&url);
        req.timeout = self.timeout;

        let res = self.client.request(req).await?;
        if !res.is_success() {
            return Err(Error::MetadataStatus {
                endpoint,
                status: res.status,
            });
        }
        Ok(res)
    }
}

impl Directory for HttpDirectory {
    async fn locations(&self) -> Result<Vec<Location>> {
        let res = self.fetch("locations", self.endpoints.locations()).await?;
        serde_json::from_slice(&res.body).map_err(|e| Error::MetadataDecode {
            endpoint: "locations",
            reason: e.to_string(),
        })
    }

    async fn trace(&self) -> Result<Trace> {
        let res = self.fetch("trace", self.endpoints.trace()).await?;
        let text = res.body_utf8().ok_or_else(|| Error::MetadataDecode {
            endpoint: "trace",
            reason: "body is not utf-8".to_string(),
        })?;
        Ok(Trace::parse(text))
    }
}
