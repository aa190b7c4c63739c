//! Per-carrier rate fan-out.

use crate::shipping::client::RateClient;
use crate::shipping::normalize::{normalize_quotes, ShippingOption};

/// Queries every supported carrier for the given destination and parcel
/// weight and returns the union of allowed, relabeled options.
///
/// One carrier failing (or returning nothing) never suppresses the others'
/// quotes; an empty result means "no service available", which the checkout
/// surfaces explicitly instead of treating as an error.
pub async fn resolve_rates(
    client: &RateClient,
    couriers: &[String],
    origin: i64,
    destination: i64,
    weight_g: i64,
) -> Vec<ShippingOption> {
    let mut options = Vec::new();
    for courier in couriers {
        match client.cost(origin, destination, weight_g, courier).await {
            Ok(payload) => {
                let quotes = normalize_quotes(courier, &payload);
                tracing::debug!(courier = %courier, quotes = quotes.len(), "rate lookup complete");
                options.extend(quotes);
            }
            Err(err) => {
                tracing::warn!(
                    courier = %courier,
                    error = %err,
                    "rate lookup failed, continuing with remaining carriers"
                );
            }
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipping::client::RetryPolicy;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> RateClient {
        let retry = RetryPolicy {
            max_retries: 0,
            backoff_base_ms: 0,
        };
        RateClient::with_base_url("test-key", 5, retry, base_url).unwrap()
    }

    #[tokio::test]
    async fn one_carrier_failure_does_not_block_the_other() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calculate/domestic-cost"))
            .and(body_string_contains("courier=jne"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/calculate/domestic-cost"))
            .and(body_string_contains("courier=tiki"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "code": "tiki", "name": "TIKI", "service": "ECO",
                      "description": "Ekonomis", "cost": 17000, "etd": "4 day" }
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let couriers = vec!["jne".to_string(), "tiki".to_string()];
        let options = resolve_rates(&client, &couriers, 6736, 90231, 500).await;
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].courier, "tiki");
        assert_eq!(options[0].cost, 17_000);
    }

    #[tokio::test]
    async fn all_carriers_failing_yields_no_options_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calculate/domestic-cost"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let couriers = vec!["jne".to_string(), "tiki".to_string()];
        let options = resolve_rates(&client, &couriers, 6736, 90231, 500).await;
        assert!(options.is_empty());
    }
}
