//! # HTTP Listing Lookup
//!
//! Reads property summaries from the listing service.
//!
//! `GET {base_url}/properties/{id}` is expected to answer with
//! `{ "owner_id": "...", "is_available": true }`; a 404 means the property
//! does not exist.

use crate::application::ports::{ListingLookup, LookupError, PropertySummary};
use crate::domain::value_objects::{PropertyId, UserId};
use crate::infrastructure::http_client::{HttpClient, HttpError, HttpResult};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PropertyResponse {
    owner_id: String,
    #[serde(default = "default_available")]
    is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Listing lookup backed by the listing service's REST API.
#[derive(Debug, Clone)]
pub struct HttpListingLookup {
    client: HttpClient,
    base_url: String,
}

impl HttpListingLookup {
    /// Creates a lookup against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::Configuration` if the client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> HttpResult<Self> {
        Ok(Self {
            client: HttpClient::new(timeout_ms)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn property_url(&self, property_id: &PropertyId) -> String {
        format!("{}/properties/{}", self.base_url, property_id)
    }
}

#[async_trait]
impl ListingLookup for HttpListingLookup {
    async fn get_property(
        &self,
        property_id: &PropertyId,
    ) -> Result<Option<PropertySummary>, LookupError> {
        let response: Option<PropertyResponse> = self
            .client
            .get_optional(&self.property_url(property_id))
            .await
            .map_err(|e| match e {
                HttpError::Timeout | HttpError::Connection(_) => {
                    LookupError::Connection(e.to_string())
                }
                other => LookupError::Protocol(other.to_string()),
            })?;

        Ok(response.map(|body| PropertySummary {
            property_id: property_id.clone(),
            owner_id: UserId::new(body.owner_id),
            is_available: body.is_available,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn lookup_for(server: &MockServer) -> HttpListingLookup {
        HttpListingLookup::new(format!("{}/", server.uri()), 1000).unwrap()
    }

    #[tokio::test]
    async fn parses_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/properties/prop-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "owner_id": "seller-1",
                "is_available": false,
                "title": "ignored"
            })))
            .mount(&server)
            .await;

        let summary = lookup_for(&server)
            .await
            .get_property(&PropertyId::new("prop-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.owner_id.as_str(), "seller-1");
        assert!(!summary.is_available);
        assert_eq!(summary.property_id.as_str(), "prop-1");
    }

    #[tokio::test]
    async fn missing_property_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = lookup_for(&server)
            .await
            .get_property(&PropertyId::new("gone"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn server_error_is_connection_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = lookup_for(&server)
            .await
            .get_property(&PropertyId::new("prop-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Connection(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = lookup_for(&server)
            .await
            .get_property(&PropertyId::new("prop-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Protocol(_)));
    }
}
