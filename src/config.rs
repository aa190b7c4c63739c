//! Environment-variable configuration.

use std::net::SocketAddr;

use crate::shipping::client::RetryPolicy;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Storefront origin, used for the payment redirect URLs.
    pub public_base_url: String,
    pub rate_api_key: String,
    pub rate_base_url: Option<String>,
    pub payment_secret_key: String,
    pub payment_base_url: Option<String>,
    /// Warehouse district the parcels ship from.
    pub origin_district_id: i64,
    /// Weight assumed for products with no recorded weight.
    pub default_item_weight_g: i32,
    pub couriers: Vec<String>,
    pub http_timeout_secs: u64,
    pub rate_max_retries: u32,
    pub rate_backoff_base_ms: u64,
}

impl AppConfig {
    /// Loads configuration from the environment, with defaults for everything
    /// except the database URL and the two provider credentials.
    pub fn load() -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = format!(
            "0.0.0.0:{}",
            env_or("PORT", "8083")
        )
        .parse()?;
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_addr,
            log_level: env_or("LOG_LEVEL", "info"),
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:5173"),
            rate_api_key: required("RATE_API_KEY")?,
            rate_base_url: std::env::var("RATE_BASE_URL").ok(),
            payment_secret_key: required("PAYMENT_SECRET_KEY")?,
            payment_base_url: std::env::var("PAYMENT_BASE_URL").ok(),
            origin_district_id: env_or("ORIGIN_DISTRICT_ID", "6736").parse()?,
            default_item_weight_g: env_or("DEFAULT_ITEM_WEIGHT_G", "250").parse()?,
            couriers: env_or("COURIERS", "jne,tiki")
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            http_timeout_secs: env_or("HTTP_TIMEOUT_SECS", "15").parse()?,
            rate_max_retries: env_or("RATE_MAX_RETRIES", "2").parse()?,
            rate_backoff_base_ms: env_or("RATE_BACKOFF_BASE_MS", "500").parse()?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.rate_max_retries,
            backoff_base_ms: self.rate_backoff_base_ms,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("{key} is not set"))
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("public_base_url", &self.public_base_url)
            .field("database_url", &"[redacted]")
            .field("rate_api_key", &"[redacted]")
            .field("payment_secret_key", &"[redacted]")
            .field("origin_district_id", &self.origin_district_id)
            .field("default_item_weight_g", &self.default_item_weight_g)
            .field("couriers", &self.couriers)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("rate_max_retries", &self.rate_max_retries)
            .field("rate_backoff_base_ms", &self.rate_backoff_base_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let config = AppConfig {
            database_url: "postgres://user:pw@localhost/db".into(),
            bind_addr: "0.0.0.0:8083".parse().unwrap(),
            log_level: "info".into(),
            public_base_url: "http://localhost:5173".into(),
            rate_api_key: "rk-secret".into(),
            rate_base_url: None,
            payment_secret_key: "sk-secret".into(),
            payment_base_url: None,
            origin_district_id: 6736,
            default_item_weight_g: 250,
            couriers: vec!["jne".into(), "tiki".into()],
            http_timeout_secs: 15,
            rate_max_retries: 2,
            rate_backoff_base_ms: 500,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("rk-secret"));
        assert!(!rendered.contains("postgres://"));
        assert!(rendered.contains("[redacted]"));
    }
}
