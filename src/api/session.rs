//! Authenticated HTTP session for the JIRA REST API.
//!
//! Every API call goes through [`HttpSession::request`], which attaches the
//! authorization header, applies the TLS and timeout settings, maps non-2xx
//! responses to [`ApiError`] and retries transient failures according to a
//! [`RetryPolicy`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::credentials::Credentials;
use super::error::{ApiError, ErrorKind, Result};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Delay before the single retry of a transient failure.
const RETRY_DELAY_MS: u64 = 500;

static INSECURE_TLS_WARNING: WarnOnce = WarnOnce::new();

/// A flag that lets a warning through exactly once.
#[derive(Debug)]
pub struct WarnOnce(AtomicBool);

impl WarnOnce {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Returns `true` the first time it is called, `false` afterwards.
    pub fn fire(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}

impl Default for WarnOnce {
    fn default() -> Self {
        Self::new()
    }
}

/// When and how often a failed request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Fixed delay before each retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Whether a request that failed with `error` on attempt `attempt`
    /// (1-based) should be sent again.
    pub fn should_retry(&self, error: &ApiError, attempt: u32) -> bool {
        attempt <= self.max_retries
            && matches!(error.kind(), ErrorKind::Network | ErrorKind::ServerError)
    }

    /// Run `op` until it succeeds, fails permanently or runs out of retries.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(&e, attempt) => {
                    warn!(
                        "Request failed (attempt {}), retrying in {}ms: {}",
                        attempt,
                        self.backoff.as_millis(),
                        e
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Raw(Vec<u8>),
    Empty,
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl ApiResponse {
    /// Deserialize a JSON body into `T`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        match self.body {
            ResponseBody::Json(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e))),
            ResponseBody::Raw(_) => Err(ApiError::InvalidResponse(
                "expected a JSON body".to_string(),
            )),
            ResponseBody::Empty => Err(ApiError::InvalidResponse(
                "expected a JSON body, got an empty response".to_string(),
            )),
        }
    }
}

/// The HTTP session shared by all API calls of one run.
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    credentials: Credentials,
    retry: RetryPolicy,
}

impl HttpSession {
    /// Build a session with the default timeout and retry policy.
    ///
    /// When `credentials.verify_ssl()` is false, certificate validation is
    /// disabled and a warning is logged once per process.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_options(
            credentials,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            RetryPolicy::default(),
        )
    }

    /// Build a session with an explicit timeout and retry policy.
    pub fn with_options(
        credentials: Credentials,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if !credentials.verify_ssl() && INSECURE_TLS_WARNING.fire() {
            warn!(
                "SSL certificate verification is disabled for {}; connections are not secure",
                credentials.base_url()
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!credentials.verify_ssl())
            .build()
            .map_err(ApiError::from)?;

        Ok(Self {
            client,
            credentials,
            retry,
        })
    }

    /// The JIRA base URL.
    pub fn base_url(&self) -> &str {
        self.credentials.base_url()
    }

    /// Issue a request against `path` (relative to the base URL).
    ///
    /// Idempotent methods are retried according to the session's
    /// [`RetryPolicy`]; other methods are sent exactly once.
    ///
    /// # Errors
    ///
    /// Transport failures become `ApiError::Network`; non-2xx statuses are
    /// mapped with [`ApiError::from_status`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        let policy = if method.is_idempotent() {
            self.retry
        } else {
            RetryPolicy::none()
        };

        policy
            .run(|| self.send(method.clone(), path, query, body))
            .await
    }

    /// `GET` a JSON resource.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.request(Method::GET, path, query, None).await?.json()
    }

    /// `POST` a JSON body and decode the JSON response.
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.request(Method::POST, path, &[], Some(body))
            .await?
            .json()
    }

    /// Send a single attempt.
    #[instrument(skip(self, query, body), fields(method = %method, path = %path))]
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        let url = format!("{}/{}", self.base_url(), path.trim_start_matches('/'));
        let started = Instant::now();

        let mut request = self
            .client
            .request(method, &url)
            .header(header::AUTHORIZATION, self.credentials.header_value())
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Transport failure: {}", e);
            ApiError::from(e)
        })?;

        debug!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Response received"
        );

        Self::handle_response(response).await
    }

    /// Handle the HTTP response, checking for errors and decoding the body.
    async fn handle_response(response: Response) -> Result<ApiResponse> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            debug!("Error response body: {}", text);
            return Err(error_from_response(status, &text));
        }

        let body = if bytes.is_empty() || status == StatusCode::NO_CONTENT {
            ResponseBody::Empty
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => ResponseBody::Json(value),
                Err(_) => ResponseBody::Raw(bytes.to_vec()),
            }
        };

        Ok(ApiResponse { status, body })
    }
}

/// Create an appropriate error from an HTTP error response.
///
/// JIRA reports failures as `{"errorMessages": [...], "errors": {field: msg}}`;
/// those messages are passed through as-is. Anything else falls back to the
/// raw body, or the status reason when the body is empty.
pub fn error_from_response(status: StatusCode, body: &str) -> ApiError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let mut messages: Vec<String> = json
            .get("errorMessages")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(errors) = json.get("errors").and_then(Value::as_object) {
            messages.extend(errors.iter().map(|(field, v)| match v.as_str() {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: {}", field, v),
            }));
        }

        if !messages.is_empty() {
            return ApiError::from_status(status, &messages.join(", "));
        }
    }

    let body = body.trim();
    if body.is_empty() {
        ApiError::from_status(status, status.canonical_reason().unwrap_or("no details"))
    } else {
        ApiError::from_status(status, body)
    }
}
