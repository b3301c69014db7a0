use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use log::debug;
use reqwest::{Method, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::utils::config::HttpConfig;

/// Why a single retrieval strategy yielded nothing.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("unexpected payload shape: {0}")]
    Shape(&'static str),
    #[error("no postings found")]
    Empty,
}

impl FetchError {
    /// Rate limits, server errors and timeouts are worth another attempt;
    /// everything else abandons the strategy immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status(code) => *code == 429 || (500..600).contains(code),
            FetchError::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// One outgoing request. Kept separate from `reqwest::RequestBuilder` so the
/// same description can be replayed by the retry loop.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    headers: Vec<(&'static str, String)>,
    body: Option<Value>,
    timeout: Option<Duration>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Request {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Request {
            method: Method::POST,
            body: Some(body),
            ..Request::get(url)
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Origin/Referer pair for providers that check them against their own board host.
    pub fn board_origin(self, origin: &str, referer: &str) -> Self {
        self.header("Origin", origin).header("Referer", referer)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Status and body of a request that was allowed to fail.
#[derive(Debug, Clone)]
pub struct Probe {
    pub status: u16,
    pub body: String,
}

/// Shared async client with a browser-like identity and bounded retries.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    max_retries: usize,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/html;q=0.9, */*;q=0.8"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(HttpClient {
            client,
            max_retries: config.max_retries,
        })
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(8))
            .with_max_times(self.max_retries)
            .with_jitter()
    }

    fn build(&self, request: &Request) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    async fn attempt(&self, request: &Request) -> Result<String, FetchError> {
        let response = self.build(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    /// Body of a successful response, retrying transient failures.
    pub async fn text(&self, request: &Request) -> Result<String, FetchError> {
        (|| async { self.attempt(request).await })
            .retry(self.backoff())
            .when(FetchError::is_transient)
            .notify(|err, after| debug!("retrying {} in {:?}: {}", request.url, after, err))
            .await
    }

    pub async fn json<T: DeserializeOwned>(&self, request: &Request) -> Result<T, FetchError> {
        let body = self.text(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Single attempt that reports the status instead of failing on it.
    pub async fn probe(&self, request: &Request) -> Result<Probe, FetchError> {
        let response = self.build(request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(Probe { status, body })
    }
}
