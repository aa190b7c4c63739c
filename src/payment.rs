//! HTTP client for the payment-invoice provider.
//!
//! Creates a hosted invoice for a submitted order and returns the URL the
//! browser is redirected to. The provider authenticates with HTTP basic auth
//! (secret key as username, empty password). Invoice creation is never
//! retried automatically: a failure is surfaced to the customer as a
//! retryable error with the order left in `pending`.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.xendit.co/";

#[derive(Debug, Error)]
pub enum PaymentError {
    /// Network or TLS failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the invoice request.
    #[error("invoice provider error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("unexpected invoice-provider response: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// One invoice line item; the sum over items must equal `amount`.
#[derive(Clone, Debug, Serialize)]
pub struct InvoiceItem {
    pub name: String,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Serialize)]
struct CustomerPayload<'a> {
    given_names: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mobile_number: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct InvoicePayload<'a> {
    external_id: &'a str,
    amount: i64,
    payer_email: &'a str,
    description: String,
    currency: &'static str,
    customer: CustomerPayload<'a>,
    items: &'a [InvoiceItem],
    success_redirect_url: String,
    failure_redirect_url: String,
}

/// Everything the provider needs to host a payment page for one order.
#[derive(Clone, Debug)]
pub struct InvoiceRequest {
    pub order_id: String,
    pub amount: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub items: Vec<InvoiceItem>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub invoice_url: String,
}

pub struct InvoiceClient {
    client: Client,
    secret_key: String,
    base_url: Url,
    /// Storefront origin used to build the success/failure redirect URLs.
    public_base_url: String,
}

impl InvoiceClient {
    pub fn new(
        secret_key: &str,
        public_base_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, PaymentError> {
        Self::with_base_url(secret_key, public_base_url, timeout_secs, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        secret_key: &str,
        public_base_url: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| PaymentError::Api {
            status: 0,
            message: format!("invalid base URL '{base_url}': {e}"),
        })?;
        Ok(Self {
            client,
            secret_key: secret_key.to_owned(),
            base_url,
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Creates a hosted invoice for the order and returns its redirect URL.
    pub async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, PaymentError> {
        let url = self.base_url.join("v2/invoices").map_err(|e| PaymentError::Api {
            status: 0,
            message: e.to_string(),
        })?;
        let short_id: String = request.order_id.chars().take(8).collect();
        let payload = InvoicePayload {
            external_id: &request.order_id,
            amount: request.amount,
            payer_email: &request.customer_email,
            description: format!("Order #{short_id}"),
            currency: "IDR",
            customer: CustomerPayload {
                given_names: &request.customer_name,
                email: &request.customer_email,
                mobile_number: request.customer_phone.as_deref(),
            },
            items: &request.items,
            success_redirect_url: format!(
                "{}/checkout/success?order_id={}",
                self.public_base_url, request.order_id
            ),
            failure_redirect_url: format!(
                "{}/checkout/failed?order_id={}",
                self.public_base_url, request.order_id
            ),
        };

        let response = self
            .client
            .post(url)
            .basic_auth(&self.secret_key, Some(""))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .and_then(serde_json::Value::as_str)
                        .map(String::from)
                })
                .unwrap_or(body);
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> InvoiceRequest {
        InvoiceRequest {
            order_id: "0192d3a4-dead-beef-0000-000000000000".into(),
            amount: 185_000,
            customer_name: "Andi".into(),
            customer_email: "andi@example.com".into(),
            customer_phone: Some("081234567890".into()),
            items: vec![
                InvoiceItem {
                    name: "Toraja Sapan 200g".into(),
                    quantity: 1,
                    price: 165_000,
                },
                InvoiceItem {
                    name: "Shipping - JNE Reguler".into(),
                    quantity: 1,
                    price: 20_000,
                },
            ],
        }
    }

    #[tokio::test]
    async fn creates_invoice_and_returns_redirect_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/invoices"))
            .and(header_exists("authorization"))
            .and(body_partial_json(serde_json::json!({
                "external_id": "0192d3a4-dead-beef-0000-000000000000",
                "amount": 185000,
                "currency": "IDR",
                "customer": { "given_names": "Andi" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "inv-123",
                "invoice_url": "https://checkout.example.com/inv-123",
                "status": "PENDING"
            })))
            .mount(&server)
            .await;

        let client =
            InvoiceClient::with_base_url("sk-test", "https://shop.example.com", 5, &server.uri())
                .unwrap();
        let invoice = client.create_invoice(&request()).await.unwrap();
        assert_eq!(invoice.id, "inv-123");
        assert_eq!(invoice.invoice_url, "https://checkout.example.com/inv-123");
    }

    #[tokio::test]
    async fn provider_rejection_carries_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/invoices"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error_code": "INVALID_API_KEY",
                "message": "API key is invalid"
            })))
            .mount(&server)
            .await;

        let client =
            InvoiceClient::with_base_url("sk-test", "https://shop.example.com", 5, &server.uri())
                .unwrap();
        match client.create_invoice(&request()).await {
            Err(PaymentError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key is invalid");
            }
            other => panic!("expected provider rejection, got {other:?}"),
        }
    }
}
