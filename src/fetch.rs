//! Fetch with retry - The runtime's one asynchronous operation.
//!
//! A [`FetchRequest`] is prepared into a [`WireRequest`] (JSON content type
//! by default, JSON bodies serialized) and handed to a [`Transport`]. A
//! non-2xx status, a transport failure or an undecodable JSON body all count
//! as a failed attempt. Attempt `n` failing waits `backoff * n` before the
//! next one; the last failure is returned as is.
//!
//! ```ignore
//! let transport = HttpTransport::new();
//! let request = FetchRequest::post("https://api.example.com/todos")
//!     .with_json(json!({"title": "write docs"}));
//! let payload = fetch_with_retry(&transport, &request, RetryPolicy::default()).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FetchError;

pub const CONTENT_TYPE: &str = "Content-Type";
const JSON_MIME: &str = "application/json";

// =============================================================================
// Retry policy
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Base delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

// =============================================================================
// Request / response
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized with `serde_json`.
    Json(Value),
    /// Sent verbatim.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).with_method("POST")
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    /// Set a header, replacing any existing one of the same name
    /// (case-insensitive).
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn with_text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    /// Wire form: caller headers over a JSON `Content-Type` default.
    pub fn prepare(&self) -> Result<WireRequest, FetchError> {
        let mut headers = Vec::with_capacity(self.headers.len() + 1);
        if !self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(CONTENT_TYPE)) {
            headers.push((CONTENT_TYPE.to_string(), JSON_MIME.to_string()));
        }
        headers.extend(self.headers.iter().cloned());

        let body = match &self.body {
            Some(RequestBody::Json(value)) => Some(
                serde_json::to_string(value).map_err(|e| FetchError::Decode(e.to_string()))?,
            ),
            Some(RequestBody::Text(text)) => Some(text.clone()),
            None => None,
        };

        Ok(WireRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers,
            body,
        })
    }
}

/// A request exactly as the transport sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl WireRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    /// `Content-Type` header, empty when absent.
    pub content_type: String,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

// =============================================================================
// Transport
// =============================================================================

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &WireRequest) -> Result<FetchResponse, FetchError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &WireRequest) -> Result<FetchResponse, FetchError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}

// =============================================================================
// fetch_with_retry
// =============================================================================

/// Send `request` until it succeeds or the attempt budget runs out.
pub async fn fetch_with_retry<T>(
    transport: &T,
    request: &FetchRequest,
    policy: RetryPolicy,
) -> Result<Payload, FetchError>
where
    T: Transport + ?Sized,
{
    let wire = request.prepare()?;
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match fetch_once(transport, &wire).await {
            Ok(payload) => {
                debug!(url = %wire.url, attempt, "fetch succeeded");
                return Ok(payload);
            }
            Err(err) if attempt >= attempts => return Err(err),
            Err(err) => {
                let delay = policy.delay_after(attempt);
                warn!(url = %wire.url, attempt, ?delay, %err, "fetch failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

async fn fetch_once<T>(transport: &T, wire: &WireRequest) -> Result<Payload, FetchError>
where
    T: Transport + ?Sized,
{
    let response = transport.send(wire).await?;
    if !response.is_success() {
        return Err(FetchError::Status(response.status));
    }
    if response.content_type.contains("json") {
        serde_json::from_str(&response.body)
            .map(Payload::Json)
            .map_err(|e| FetchError::Decode(e.to_string()))
    } else {
        Ok(Payload::Text(response.body))
    }
}
