//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_JSON`: emit JSON log lines (default: `false`)
/// - `DATABASE_URL`: PostgreSQL URL; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `ORDER_PAID_TOPIC`: default: `"order-paid"`
/// - `FULFILLMENT_COMPLETED_TOPIC`: default: `"fulfillment-completed"`
/// - `FULFILLMENT_CONSUMER_GROUP`: default: `"order-service"`
/// - `REQUEST_TIMEOUT_SECS`: per-request deadline (default: `30`)
/// - `MAX_DELIVERY_ATTEMPTS`: before a message is dead-lettered (default: `5`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub order_paid_topic: String,
    pub fulfillment_completed_topic: String,
    pub fulfillment_consumer_group: String,
    pub request_timeout: Duration,
    pub max_delivery_attempts: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);

        Self {
            host: text("HOST", defaults.host),
            port: parse_or(lookup("PORT"), defaults.port),
            log_level: text("RUST_LOG", defaults.log_level),
            log_json: lookup("LOG_JSON")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.log_json),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: parse_or(
                lookup("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            ),
            order_paid_topic: text("ORDER_PAID_TOPIC", defaults.order_paid_topic),
            fulfillment_completed_topic: text(
                "FULFILLMENT_COMPLETED_TOPIC",
                defaults.fulfillment_completed_topic,
            ),
            fulfillment_consumer_group: text(
                "FULFILLMENT_CONSUMER_GROUP",
                defaults.fulfillment_consumer_group,
            ),
            request_timeout: lookup("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_delivery_attempts: parse_or(
                lookup("MAX_DELIVERY_ATTEMPTS"),
                defaults.max_delivery_attempts,
            ),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_json: false,
            database_url: None,
            database_max_connections: 5,
            order_paid_topic: messaging::ORDER_PAID_TOPIC.to_string(),
            fulfillment_completed_topic: orchestrator::FULFILLMENT_COMPLETED_TOPIC.to_string(),
            fulfillment_consumer_group: "order-service".to_string(),
            request_timeout: Duration::from_secs(30),
            max_delivery_attempts: messaging::DEFAULT_MAX_DELIVERY_ATTEMPTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.database_url, None);
        assert_eq!(config.order_paid_topic, "order-paid");
        assert_eq!(config.fulfillment_completed_topic, "fulfillment-completed");
        assert_eq!(config.fulfillment_consumer_group, "order-service");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_delivery_attempts, 5);
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        assert_eq!(from_pairs(&[]), Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("PORT", "8081"),
            ("LOG_JSON", "true"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("DATABASE_MAX_CONNECTIONS", "20"),
            ("FULFILLMENT_CONSUMER_GROUP", "orders-eu"),
            ("REQUEST_TIMEOUT_SECS", "3"),
            ("MAX_DELIVERY_ATTEMPTS", "9"),
        ]);

        assert_eq!(config.port, 8081);
        assert!(config.log_json);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/orders"));
        assert_eq!(config.database_max_connections, 20);
        assert_eq!(config.fulfillment_consumer_group, "orders-eu");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.max_delivery_attempts, 9);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = from_pairs(&[("PORT", "http"), ("REQUEST_TIMEOUT_SECS", "-1")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_empty_database_url_means_in_memory() {
        assert_eq!(from_pairs(&[("DATABASE_URL", "")]).database_url, None);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
