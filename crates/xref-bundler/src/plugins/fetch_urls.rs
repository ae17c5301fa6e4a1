use async_trait::async_trait;
use serde_json::Value;

use super::{LoaderError, LoaderPlugin, parse_document};
use crate::limiter::ConcurrencyLimiter;
use crate::refs::is_remote_url;

/// Extra headers sent to a set of hosts.
///
/// A domain matches either the URL's host (`api.example.com`) or its
/// host and port (`localhost:8080`).
#[derive(Debug, Clone, Default)]
pub struct DomainHeaders {
    pub domains: Vec<String>,
    pub headers: Vec<(String, String)>,
}

impl DomainHeaders {
    pub fn new(domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            domains: domains.into_iter().map(Into::into).collect(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn matches(&self, url: &url::Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host_port = url.port().map(|port| format!("{host}:{port}"));
        self.domains
            .iter()
            .any(|domain| domain == host || host_port.as_deref() == Some(domain.as_str()))
    }
}

/// Loads `http(s)` URLs and parses the body as JSON or YAML.
#[derive(Debug, Clone)]
pub struct FetchUrls {
    client: reqwest::Client,
    headers: Vec<DomainHeaders>,
    limiter: Option<ConcurrencyLimiter>,
}

impl FetchUrls {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            headers: Vec::new(),
            limiter: None,
        }
    }

    /// Use a preconfigured client (proxies, timeouts, TLS roots).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Attach headers to requests for matching hosts. Every matching entry applies.
    pub fn with_headers(mut self, headers: DomainHeaders) -> Self {
        self.headers.push(headers);
        self
    }

    /// Bound the number of requests in flight.
    pub fn with_limiter(mut self, limiter: ConcurrencyLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    async fn fetch(&self, identifier: &str) -> Result<String, LoaderError> {
        let http_error = |e: reqwest::Error| LoaderError::Http {
            url: identifier.to_string(),
            message: e.to_string(),
        };

        let mut request = self.client.get(identifier);
        if let Ok(url) = url::Url::parse(identifier) {
            for entry in self.headers.iter().filter(|entry| entry.matches(&url)) {
                for (name, value) in &entry.headers {
                    request = request.header(name.as_str(), value.as_str());
                }
            }
        }

        let response = request.send().await.map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoaderError::Status {
                url: identifier.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(http_error)
    }
}

impl Default for FetchUrls {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoaderPlugin for FetchUrls {
    fn name(&self) -> &'static str {
        "fetch-urls"
    }

    fn validate(&self, identifier: &str) -> bool {
        is_remote_url(identifier)
    }

    async fn exec(&self, identifier: &str) -> Result<Value, LoaderError> {
        let body = match &self.limiter {
            Some(limiter) => limiter.run(self.fetch(identifier)).await?,
            None => self.fetch(identifier).await?,
        };
        parse_document(identifier, &body)
    }
}
