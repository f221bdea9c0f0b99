use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client, Method, StatusCode};
use serde_json::Value;
use shared::protocol::{HealthStatus, JsonObject};
use tracing::{info, warn};

use crate::{config::ClientSettings, error::RequestError};

pub const API_VERSION_PREFIX: &str = "/v1";
pub const API_KEY_HEADER: &str = "X-Api-Key";
pub const TUNNEL_WARNING_HEADER: &str = "ngrok-skip-browser-warning";
const LOG_PREVIEW_LEN: usize = 160;
const ERROR_PREVIEW_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Linear backoff: the wait after the failed `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn preview(text: &str, len: usize) -> String {
    text.chars().take(len).collect()
}

/// Ensures one leading slash and no repeated slashes.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut normalized = format!("/{}", segments.join("/"));
    if path.ends_with('/') && !segments.is_empty() {
        normalized.push('/');
    }
    normalized
}

pub fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

/// HTTP client for the workshop-operations backend.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl RemoteClient {
    pub fn new(api_base: &str, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: normalize_base(api_base),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::new(&settings.api_base, settings.api_key.clone())
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{API_VERSION_PREFIX}{}", self.base_url, normalize_path(path))
    }

    pub async fn get(&self, path: &str) -> Result<JsonObject, RequestError> {
        self.request(path, Method::default(), None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<JsonObject, RequestError> {
        self.request(path, Method::POST, Some(body)).await
    }

    /// Sends one logical request, retrying 429 and 5xx responses.
    ///
    /// A 2xx body that is not a JSON object fails immediately with
    /// [`RequestError::ResponseShape`]; other statuses are not retried.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<JsonObject, RequestError> {
        let url = self.endpoint_url(path);

        for attempt in 1..=self.retry.max_attempts {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .header(API_KEY_HEADER, &self.api_key)
                .header(TUNNEL_WARNING_HEADER, "1")
                .header(CONTENT_TYPE, "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            info!(
                url = %url,
                status = status.as_u16(),
                attempt,
                preview = %preview(&text, LOG_PREVIEW_LEN),
                "wsop api response"
            );

            if status.is_success() {
                return parse_object(status, &text);
            }

            let failure = RequestError::Status {
                status: status.as_u16(),
                body: preview(&text, ERROR_PREVIEW_LEN),
            };
            if !is_retryable(status) || attempt == self.retry.max_attempts {
                return Err(failure);
            }

            let delay = self.retry.delay_after(attempt);
            warn!(
                url = %url,
                status = status.as_u16(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "wsop api retryable status; backing off"
            );
            tokio::time::sleep(delay).await;
        }

        Err(RequestError::Config(
            "retry policy allows no attempts".to_string(),
        ))
    }

    /// Liveness probe on `/healthz`, outside the versioned API.
    pub async fn healthz(&self) -> Result<HealthStatus, RequestError> {
        if self.base_url.is_empty() || self.api_key.is_empty() {
            return Err(RequestError::Config(
                "missing API base or API key".to_string(),
            ));
        }

        let url = format!("{}/healthz", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(TUNNEL_WARNING_HEADER, "1")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        info!(url = %url, status = status.as_u16(), "wsop health probe");

        Ok(HealthStatus {
            ok: status.is_success(),
            status: status.as_u16(),
            body,
        })
    }
}

fn parse_object(status: StatusCode, text: &str) -> Result<JsonObject, RequestError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Ok(object),
        _ => Err(RequestError::ResponseShape {
            status: status.as_u16(),
            preview: preview(text, ERROR_PREVIEW_LEN),
        }),
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
