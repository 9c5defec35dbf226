use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

const GENERIC_FAILURE: &str = "API request failed";

/// Failure of a single backend call: network error, undecodable body, or a
/// non-success status. `message` is the backend's `error` field when it sent
/// one; the full body is kept in `detail` for logging.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: String,
    pub detail: Option<Value>,
}

impl ApiError {
    fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            detail: None,
        }
    }

    fn from_body(status: u16, body: Option<Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(Value::as_str)
            .unwrap_or(GENERIC_FAILURE)
            .to_string();
        Self {
            status: Some(status),
            message,
            detail: body,
        }
    }

    /// Backend `message` field, usually the underlying exception text.
    pub fn backend_message(&self) -> Option<&str> {
        self.detail_str("message")
    }

    pub fn backend_timestamp(&self) -> Option<&str> {
        self.detail_str("timestamp")
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.detail
            .as_ref()
            .and_then(|d| d.get("suggestions"))
            .and_then(Value::as_array)
            .map(|s| s.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn detail_str(&self, key: &str) -> Option<&str> {
        self.detail.as_ref()?.get(key)?.as_str()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "API error ({}): {}", status, self.message),
            None => write!(f, "API error: {}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Transport seam between the orchestrator and the search backend.
/// One call, one attempt: no retry, no backoff.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn call(&self, path: &str, method: Method, body: Option<Value>) -> Result<Value, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Gateway for ApiClient {
    async fn call(&self, path: &str, method: Method, body: Option<Value>) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        let parsed = response.json::<Value>().await;

        if !status.is_success() {
            return Err(ApiError::from_body(status.as_u16(), parsed.ok()));
        }

        parsed.map_err(|e| ApiError {
            status: Some(status.as_u16()),
            message: format!("Failed to parse response: {}", e),
            detail: None,
        })
    }
}
