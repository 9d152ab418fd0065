//! Range fetching over HTTP.

use crate::traits::Fetcher;
use async_trait::async_trait;
use pageless_core::{FetchRequest, HttpMethod, PagelessError, PagelessResult};
use reqwest::{Client, Url};
use std::time::Duration;

/// A [`Fetcher`] that asks a remote endpoint for rendered items.
///
/// Each request's `url` is resolved against the base URL, so the default
/// `/data` targets the base host while an absolute URL is used as is. GET
/// carries the range parameters in the query string, POST as a form body.
/// The response body holds one rendered item per non-empty line.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: &str) -> PagelessResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                PagelessError::Configuration(format!("cannot build HTTP client: {}", e))
            })?;
        Self::with_client(client, base)
    }

    pub fn with_client(client: Client, base: &str) -> PagelessResult<Self> {
        let base = Url::parse(base).map_err(|e| {
            PagelessError::Configuration(format!("invalid base URL '{}': {}", base, e))
        })?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Where `request` is sent, before its range parameters are attached.
    pub fn endpoint(&self, request: &FetchRequest) -> PagelessResult<Url> {
        self.base
            .join(&request.url)
            .map_err(|e| fetch_error(request, format!("invalid url '{}': {}", request.url, e)))
    }
}

fn fetch_error(request: &FetchRequest, reason: impl Into<String>) -> PagelessError {
    let range = request.range();
    PagelessError::Fetch {
        start: range.start,
        end: range.end,
        reason: reason.into(),
    }
}

/// One item per non-empty line, surrounding whitespace trimmed.
pub fn split_items(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Fetcher for HttpSource {
    async fn fetch(&self, request: FetchRequest) -> PagelessResult<Vec<String>> {
        let endpoint = self.endpoint(&request)?;
        let params = request.params();
        tracing::debug!(
            method = %request.method,
            url = %endpoint,
            start = request.start,
            count = request.count,
            "Requesting range"
        );

        let builder = match request.method {
            HttpMethod::Get => self.client.get(endpoint).query(&params),
            HttpMethod::Post => self.client.post(endpoint).form(&params),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| fetch_error(&request, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(&request, format!("HTTP status {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(&request, e.to_string()))?;
        Ok(split_items(&body))
    }
}
