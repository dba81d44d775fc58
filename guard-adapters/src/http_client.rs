use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::{CONTENT_TYPE, HeaderName, HeaderValue, RETRY_AFTER};
use hyper::{Body, Client, Request, Response, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{AdapterError, AdapterResult, ChatTransport};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Default per-attempt request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of attempts for connect and timeout failures.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

pub(crate) fn build_https_client() -> HyperClient {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let connector = HttpsConnector::from((http, Arc::new(config)));

    Client::builder().build::<_, Body>(connector)
}

/// Validates a base URL and normalises it to end with `/`.
pub(crate) fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid base URL: {err}")))?;
    Ok(base)
}

/// JSON-over-HTTPS transport shared by every backend.
///
/// Connect failures and timeouts are retried up to `max_attempts` times.
/// HTTP error statuses are never retried.
pub struct HttpTransport {
    client: HyperClient,
    endpoint: Uri,
    headers: Vec<(HeaderName, HeaderValue)>,
    timeout: Duration,
    max_attempts: u32,
    label: &'static str,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("label", &self.label)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates a transport posting to `endpoint`. `label` names the backend
    /// in logs and error messages.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the endpoint is not a URI.
    pub fn new(endpoint: &str, label: &'static str) -> AdapterResult<Self> {
        let endpoint = endpoint.parse::<Uri>().map_err(|err| {
            AdapterError::configuration(format!("invalid {label} endpoint: {err}"))
        })?;

        Ok(Self {
            client: build_https_client(),
            endpoint,
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            label,
        })
    }

    /// Adds a header sent with every request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the value is not a valid
    /// header value.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> AdapterResult<Self> {
        let mut value = HeaderValue::from_str(value).map_err(|err| {
            AdapterError::configuration(format!("invalid {name} header for {}: {err}", self.label))
        })?;
        value.set_sensitive(true);
        self.headers.push((name, value));
        Ok(self)
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the attempt budget for connect and timeout failures (minimum 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns the request endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    fn build_request(&self, body: Vec<u8>) -> AdapterResult<Request<Body>> {
        let mut builder = Request::post(self.endpoint.clone()).header(CONTENT_TYPE, "application/json");
        for (name, value) in &self.headers {
            builder = builder.header(name.clone(), value.clone());
        }
        builder.body(Body::from(body)).map_err(|err| {
            AdapterError::transport(format!("failed to build {} request: {err}", self.label))
        })
    }

    async fn read_response(&self, response: Response<Body>) -> AdapterResult<Value> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let bytes = to_bytes(response.into_body()).await.map_err(|err| {
            AdapterError::transport(format!("failed to read {} response: {err}", self.label))
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AdapterError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let reason = String::from_utf8_lossy(&bytes);
            return Err(AdapterError::response(format!(
                "{} returned {status}: {reason}",
                self.label
            )));
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(format!("failed to decode {} response: {err}", self.label))
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, payload: &Value) -> AdapterResult<Value> {
        let body = serde_json::to_vec(payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode {} request: {err}", self.label))
        })?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = self.build_request(body.clone())?;

            let failure = match timeout(self.timeout, self.client.request(request)).await {
                Ok(Ok(response)) => {
                    debug!(backend = self.label, status = %response.status(), attempt, "received response");
                    return self.read_response(response).await;
                }
                Ok(Err(err)) if err.is_connect() => {
                    AdapterError::transport(format!("{} connection failed: {err}", self.label))
                }
                Ok(Err(err)) => {
                    return Err(AdapterError::transport(format!(
                        "{} request failed: {err}",
                        self.label
                    )));
                }
                Err(_) => AdapterError::transport(format!("{} request timed out", self.label)),
            };

            if attempt >= self.max_attempts {
                return Err(failure);
            }
            warn!(backend = self.label, attempt, error = %failure, "retrying request");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_requires_scheme() {
        let err = sanitize_base_url("api.groq.com").expect_err("missing scheme should error");
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let base = sanitize_base_url(" https://example.com/openai ").expect("valid URL");
        assert_eq!(base, "https://example.com/openai/");
    }

    #[test]
    fn max_attempts_has_floor_of_one() {
        let transport = HttpTransport::new("https://example.com/v1/chat", "test")
            .unwrap()
            .with_max_attempts(0);
        assert_eq!(transport.max_attempts, 1);
    }

    #[test]
    fn invalid_header_value_is_configuration_error() {
        let err = HttpTransport::new("https://example.com/v1/chat", "test")
            .unwrap()
            .with_header(hyper::header::AUTHORIZATION, "Bearer bad\nkey")
            .expect_err("newline is not a valid header value");
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }
}
