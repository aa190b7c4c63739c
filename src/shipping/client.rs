//! HTTP client for the shipping-rate provider.
//!
//! Wraps `reqwest` with the provider's `key` header auth, its `data` response
//! envelope, and typed errors. Destination lookups are GETs; the cost
//! calculation is a form-encoded POST. Transient failures are retried with
//! bounded back-off.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::cascade::{Place, SubdistrictCandidate};
use crate::shipping::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://rajaongkir.komerce.id/api/v1/";

#[derive(Debug, Error)]
pub enum ShippingError {
    /// Network or TLS failure, or a non-2xx response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error payload.
    #[error("rate provider error: {0}")]
    Api(String),

    /// The response body did not match the expected shape.
    #[error("unexpected rate-provider response for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

/// Client for the rate provider's destination and cost endpoints.
pub struct RateClient {
    client: Client,
    api_key: String,
    base_url: Url,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawDestination {
    id: i64,
    #[serde(default)]
    label: String,
    #[serde(default)]
    subdistrict_name: Option<String>,
    #[serde(default)]
    zip_code: Option<String>,
}

impl RateClient {
    /// Creates a client pointed at the production provider.
    ///
    /// # Errors
    ///
    /// Returns [`ShippingError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, ShippingError> {
        Self::with_base_url(api_key, timeout_secs, retry, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for tests against a mock
    /// server).
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        retry: RetryPolicy,
        base_url: &str,
    ) -> Result<Self, ShippingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        // A single trailing slash keeps Url::join appending path segments
        // instead of replacing the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| ShippingError::Api(format!("invalid base URL '{base_url}': {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            retry,
        })
    }

    pub async fn provinces(&self) -> Result<Vec<Place>, ShippingError> {
        self.fetch_places("destination/province").await
    }

    pub async fn cities(&self, province_id: i64) -> Result<Vec<Place>, ShippingError> {
        self.fetch_places(&format!("destination/city/{province_id}"))
            .await
    }

    pub async fn districts(&self, city_id: i64) -> Result<Vec<Place>, ShippingError> {
        self.fetch_places(&format!("destination/district/{city_id}"))
            .await
    }

    /// Searches the destination index for subdistrict candidates; the search
    /// term is typically the selected district's name.
    pub async fn subdistricts(
        &self,
        search: &str,
    ) -> Result<Vec<SubdistrictCandidate>, ShippingError> {
        let mut url = self.join("destination/domestic-destination")?;
        url.query_pairs_mut()
            .append_pair("search", search)
            .append_pair("limit", "50")
            .append_pair("offset", "0");
        let data = self.get_data(url).await?;
        let raw: Vec<RawDestination> =
            serde_json::from_value(data).map_err(|e| ShippingError::Deserialize {
                context: format!("subdistricts(search={search})"),
                source: e,
            })?;
        Ok(raw
            .into_iter()
            .map(|d| SubdistrictCandidate {
                id: d.id,
                subdistrict: d.subdistrict_name.unwrap_or_else(|| d.label.clone()),
                label: d.label,
                zip_code: d.zip_code,
            })
            .collect())
    }

    /// Quotes the cost of shipping `weight_g` grams from `origin` to
    /// `destination` with one carrier. Returns the raw `data` payload; shape
    /// normalization is the caller's concern (see
    /// [`crate::shipping::normalize`]).
    pub async fn cost(
        &self,
        origin: i64,
        destination: i64,
        weight_g: i64,
        courier: &str,
    ) -> Result<Value, ShippingError> {
        let url = self.join("calculate/domestic-cost")?;
        let form = [
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
            ("weight", weight_g.to_string()),
            ("courier", courier.to_string()),
        ];
        let body = retry_with_backoff(self.retry.max_retries, self.retry.backoff_base_ms, || {
            self.post_json(url.clone(), &form)
        })
        .await?;
        Ok(extract_data(body))
    }

    async fn fetch_places(&self, path: &str) -> Result<Vec<Place>, ShippingError> {
        let url = self.join(path)?;
        let data = self.get_data(url).await?;
        let raw: Vec<RawPlace> =
            serde_json::from_value(data).map_err(|e| ShippingError::Deserialize {
                context: path.to_string(),
                source: e,
            })?;
        Ok(raw
            .into_iter()
            .map(|p| Place {
                id: p.id,
                name: p.name,
            })
            .collect())
    }

    async fn get_data(&self, url: Url) -> Result<Value, ShippingError> {
        let body = retry_with_backoff(self.retry.max_retries, self.retry.backoff_base_ms, || {
            self.get_json(url.clone())
        })
        .await?;
        Ok(extract_data(body))
    }

    async fn get_json(&self, url: Url) -> Result<Value, ShippingError> {
        let response = self
            .client
            .get(url.clone())
            .header("key", &self.api_key)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ShippingError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }

    async fn post_json(
        &self,
        url: Url,
        form: &[(&str, String)],
    ) -> Result<Value, ShippingError> {
        let response = self
            .client
            .post(url.clone())
            .header("key", &self.api_key)
            .form(form)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ShippingError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }

    fn join(&self, path: &str) -> Result<Url, ShippingError> {
        self.base_url
            .join(path)
            .map_err(|e| ShippingError::Api(format!("invalid path '{path}': {e}")))
    }
}

/// The provider wraps every payload in a `data` envelope; an absent envelope
/// degrades to an empty list rather than an error.
fn extract_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => map
            .remove("data")
            .unwrap_or_else(|| Value::Array(Vec::new())),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> RateClient {
        let retry = RetryPolicy {
            max_retries: 0,
            backoff_base_ms: 0,
        };
        RateClient::with_base_url("test-key", 5, retry, base_url)
            .expect("client construction should not fail")
    }

    #[tokio::test]
    async fn provinces_unwraps_data_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/destination/province"))
            .and(header("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": { "code": 200, "status": "success" },
                "data": [
                    { "id": 28, "name": "Sulawesi Selatan" },
                    { "id": 9, "name": "Jawa Barat" }
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let provinces = client.provinces().await.unwrap();
        assert_eq!(provinces.len(), 2);
        assert_eq!(provinces[0].name, "Sulawesi Selatan");
    }

    #[tokio::test]
    async fn subdistrict_search_builds_query_and_maps_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/destination/domestic-destination"))
            .and(query_param("search", "Panakkukang"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": 90231, "label": "Masale, Panakkukang, Makassar",
                      "subdistrict_name": "Masale", "zip_code": "90231" }
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let candidates = client.subdistricts("Panakkukang").await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].subdistrict, "Masale");
        assert_eq!(candidates[0].zip_code.as_deref(), Some("90231"));
    }

    #[tokio::test]
    async fn cost_posts_form_fields_and_returns_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calculate/domestic-cost"))
            .and(header("key", "test-key"))
            .and(body_string_contains("origin=6736"))
            .and(body_string_contains("destination=90231"))
            .and(body_string_contains("weight=500"))
            .and(body_string_contains("courier=jne"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "code": "jne", "name": "JNE", "service": "REG",
                      "description": "Reguler", "cost": 20000, "etd": "2-3 day" }
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let data = client.cost(6736, 90231, 500, "jne").await.unwrap();
        assert_eq!(data.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn missing_envelope_degrades_to_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/destination/province"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "message": "no results" })),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let provinces = client.provinces().await.unwrap();
        assert!(provinces.is_empty());
    }

    #[tokio::test]
    async fn server_error_surfaces_as_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/destination/province"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(matches!(
            client.provinces().await,
            Err(ShippingError::Http(_))
        ));
    }
}
