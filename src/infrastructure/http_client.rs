//! # HTTP Client Utilities
//!
//! Shared HTTP client for the listing lookup and webhook adapters.
//!
//! Wraps a `reqwest::Client` with:
//! - A per-request timeout
//! - Optional bearer credentials
//! - JSON request and response bodies
//! - Status-aware error mapping
//!
//! # Examples
//!
//! ```ignore
//! use offer_negotiation::infrastructure::http_client::HttpClient;
//!
//! let client = HttpClient::new(2000)?;
//! let summary: Option<MyResponse> = client.get_optional("https://listings/p/1").await?;
//! ```

use reqwest::{Client, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Error from an outbound HTTP call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The remote end could not be reached or failed server-side.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The remote end answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Protocol(String),

    /// The client itself could not be built.
    #[error("client configuration error: {0}")]
    Configuration(String),
}

impl HttpError {
    /// Returns true for timeouts, connection failures and 5xx answers.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Protocol(_) | Self::Configuration(_) => false,
        }
    }
}

/// Result type for HTTP calls.
pub type HttpResult<T> = Result<T, HttpError>;

/// HTTP client wrapper for outbound adapters.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout_ms: u64,
}

impl HttpClient {
    /// Creates a new HTTP client with the specified timeout.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::Configuration` if the client cannot be created.
    pub fn new(timeout_ms: u64) -> HttpResult<Self> {
        Self::build(timeout_ms, header::HeaderMap::new())
    }

    /// Creates a new HTTP client that sends `token` as a bearer credential.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::Configuration` if the token is not a valid header
    /// value or the client cannot be created.
    pub fn with_bearer(timeout_ms: u64, token: &str) -> HttpResult<Self> {
        let mut value = header::HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| HttpError::Configuration(format!("invalid bearer token: {e}")))?;
        value.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value);
        Self::build(timeout_ms, headers)
    }

    fn build(timeout_ms: u64, default_headers: header::HeaderMap) -> HttpResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .default_headers(default_headers)
            .build()
            .map_err(|e| HttpError::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, timeout_ms })
    }

    /// Returns the configured timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Makes a GET request and deserializes the JSON response.
    ///
    /// A 404 answer yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `HttpError` if the request fails, any other non-success
    /// status is returned, or the body cannot be parsed.
    pub async fn get_optional<T: DeserializeOwned>(&self, url: &str) -> HttpResult<Option<T>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| HttpError::Protocol(format!("failed to parse response: {e}")))
    }

    /// Makes a POST request with a JSON body, ignoring the response body.
    ///
    /// # Errors
    ///
    /// Returns `HttpError` if the request fails or the status is not a
    /// success.
    pub async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> HttpResult<()> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        check_status(response).await.map(|_| ())
    }
}

async fn check_status(response: Response) -> HttpResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        return Err(HttpError::Connection(format!("server error ({status}): {body}")));
    }
    Err(HttpError::Status {
        status: status.as_u16(),
        body,
    })
}

fn map_reqwest_error(error: reqwest::Error) -> HttpError {
    if error.is_timeout() {
        HttpError::Timeout
    } else if error.is_decode() {
        HttpError::Protocol(error.to_string())
    } else {
        HttpError::Connection(format!("HTTP request failed: {error}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn new_client() {
        let client = HttpClient::new(5000).unwrap();
        assert_eq!(client.timeout_ms(), 5000);
    }

    #[test]
    fn rejects_unprintable_token() {
        let err = HttpClient::with_bearer(1000, "bad\ntoken").unwrap_err();
        assert!(matches!(err, HttpError::Configuration(_)));
    }

    #[test]
    fn transient_classification() {
        assert!(HttpError::Timeout.is_transient());
        assert!(
            HttpError::Status {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !HttpError::Status {
                status: 400,
                body: String::new()
            }
            .is_transient()
        );
    }

    #[tokio::test]
    async fn not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpClient::new(1000).unwrap();
        let result: Option<serde_json::Value> = client
            .get_optional(&format!("{}/missing", server.uri()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn sends_bearer_and_maps_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header_eq("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(422).set_body_string("nope"))
            .mount(&server)
            .await;

        let client = HttpClient::with_bearer(1000, "s3cret").unwrap();
        let err = client
            .post_json(&format!("{}/hook", server.uri()), &serde_json::json!({"a": 1}))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            HttpError::Status {
                status: 422,
                body: "nope".to_string()
            }
        );
    }
}
