//! Authenticated request transport
//!
//! [`Transport`] is the single place requests leave the SDK: it
//! attaches the current bearer credential, maps HTTP status families
//! into the closed [`ErrorKind`](crate::ErrorKind) taxonomy, retries
//! safe methods once on transient failures, and tears the session down
//! exactly once when the service rejects the credential.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::SessionManager;

/// Caller-held cancellation handle. Cancelling yields
/// [`Error::Cancelled`], which sits outside the error taxonomy.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Abort every request carrying this token, including requests
    /// started after the cancellation. `send_replace` records the flag
    /// even while no request is in flight.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A single request to the admin API, relative to the configured base
/// URL.
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    multipart: Option<reqwest::multipart::Form>,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            multipart: None,
            headers: Vec::new(),
            timeout: None,
            cancel: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter only when the value is present.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// JSON body. Callers convert payloads with `serde_json::to_value`.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Multipart body; suppresses JSON serialization.
    pub fn multipart(mut self, form: reqwest::multipart::Form) -> Self {
        self.multipart = Some(form);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Override the default deadline for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_safe_method(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD)
    }
}

/// The request primitive every facade routes through.
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionManager>,
    retry_delay: Duration,
}

impl Transport {
    pub fn new(config: &Config, session: Arc<SessionManager>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
            retry_delay: config.retry_delay,
        })
    }

    /// Issue a request and parse the JSON response. Non-JSON bodies
    /// come back as a JSON string value.
    pub async fn request_json(&self, request: ApiRequest) -> Result<Value> {
        let (is_json, bytes) = self.run(request).await?;
        let value = if is_json {
            serde_json::from_slice(&bytes)?
        } else {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        };

        // Some endpoints report failure inside a 2xx envelope.
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(envelope_failure(&value));
        }
        Ok(value)
    }

    /// Issue a request and return the raw body, for exports.
    pub async fn request_bytes(&self, request: ApiRequest) -> Result<Vec<u8>> {
        let (_, bytes) = self.run(request).await?;
        Ok(bytes)
    }

    /// Issue a request and discard the body, for deletes.
    pub async fn request_unit(&self, request: ApiRequest) -> Result<()> {
        self.run(request).await.map(|_| ())
    }

    async fn run(&self, request: ApiRequest) -> Result<(bool, Vec<u8>)> {
        match request.cancel.clone() {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(Error::Cancelled),
                    result = self.run_with_retry(request) => result,
                }
            }
            None => self.run_with_retry(request).await,
        }
    }

    async fn run_with_retry(&self, mut request: ApiRequest) -> Result<(bool, Vec<u8>)> {
        // Safe methods get a single retry on transient failures;
        // anything else is sent exactly once.
        let attempts = if request.is_safe_method() { 2 } else { 1 };
        let mut last_err = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.dispatch(&mut request).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Unknown("request failed".into())))
    }

    async fn dispatch(&self, request: &mut ApiRequest) -> Result<(bool, Vec<u8>)> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        // The credential is attached here and nowhere else.
        if let Some(token) = self.session.get_token() {
            builder = builder.bearer_auth(token);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(form) = request.multipart.take() {
            builder = builder.multipart(form);
        } else if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);
        let bytes = response.bytes().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Forced logout; idempotent under concurrent 401s.
            warn!(path = %request.path, "Credential rejected, expiring session");
            self.session.expire();
        }

        if !status.is_success() {
            return Err(Error::from_status(
                status,
                &String::from_utf8_lossy(&bytes),
            ));
        }

        Ok((is_json, bytes.to_vec()))
    }
}

/// Map a `{ success: false }` envelope to an error: validation when a
/// field map is present, unknown otherwise.
fn envelope_failure(value: &Value) -> Error {
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_string();
    let fields: std::collections::HashMap<String, String> = value
        .get("errors")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    if fields.is_empty() {
        Error::Unknown(message)
    } else {
        Error::Validation { message, fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_methods() {
        assert!(ApiRequest::get("/patients").is_safe_method());
        assert!(ApiRequest::new(Method::HEAD, "/patients").is_safe_method());
        assert!(!ApiRequest::post("/patients").is_safe_method());
        assert!(!ApiRequest::delete("/patients/1").is_safe_method());
    }

    #[test]
    fn query_opt_skips_none() {
        let req = ApiRequest::get("/patients")
            .query("page", 1)
            .query_opt("search", None::<String>)
            .query_opt("status", Some("active"));
        assert_eq!(
            req.query,
            vec![
                ("page".to_string(), "1".to_string()),
                ("status".to_string(), "active".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn cancel_token_resolves() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        // No waiter exists yet; the flag must stick regardless.
        token.cancel();
        assert!(token.is_cancelled());
        // Resolves immediately when already cancelled.
        token.cancelled().await;
    }

    #[tokio::test]
    async fn cancel_token_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[test]
    fn envelope_failure_with_fields_is_validation() {
        let value = serde_json::json!({
            "success": false,
            "message": "Validation failed",
            "errors": { "email": "already exists" }
        });
        let err = envelope_failure(&value);
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn envelope_failure_without_fields_is_unknown() {
        let value = serde_json::json!({ "success": false, "message": "nope" });
        let err = envelope_failure(&value);
        assert!(matches!(err, Error::Unknown(_)));
    }
}
