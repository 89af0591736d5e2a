//! Fluent construction of [`ClientConfig`] for code that does not read a
//! config file.

use crate::config::types::{ClientConfig, QueryEntry, RequestOptions};
use crate::config::validator::ConfigValidatorImpl;
use crate::error::Result;
use crate::traits::ConfigValidator;
use std::time::Duration;

/// Builder for ClientConfig
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new config builder with an empty base URL
    pub fn new() -> Self {
        Self {
            config: ClientConfig::new(""),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Add a header sent with every request
    pub fn header<S: Into<String>>(mut self, key: S, value: S) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = Some(follow);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Replace the default request options
    pub fn defaults(mut self, defaults: RequestOptions) -> Self {
        self.config.defaults = defaults;
        self
    }

    /// Add a named read with default options
    #[must_use]
    pub fn query<K: Into<String>, E: Into<String>>(mut self, key: K, endpoint: E) -> Self {
        self.config.queries.push(QueryEntry {
            key: key.into(),
            endpoint: endpoint.into(),
            timeout_ms: None,
            retries: None,
            retry_delay_ms: None,
        });
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns an error if the base URL or any query entry is invalid
    pub fn build(self) -> Result<ClientConfig> {
        ConfigValidatorImpl::new().validate(&self.config)?;
        Ok(self.config)
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chaining() {
        let config = ClientConfigBuilder::new()
            .base_url("http://127.0.0.1:8080")
            .header("Accept", "application/json")
            .follow_redirects(false)
            .connect_timeout(Duration::from_secs(2))
            .defaults(RequestOptions::default().retries(2))
            .query("containers", "/api/containers")
            .build()
            .unwrap();

        assert_eq!(config.connect_timeout_ms, Some(2000));
        assert_eq!(config.follow_redirects, Some(false));
        assert_eq!(config.descriptors()[0].options.retries, 2);
    }

    #[test]
    fn test_builder_rejects_missing_base_url() {
        assert!(ClientConfigBuilder::new().build().is_err());
    }

    #[test]
    fn test_builder_from_existing_config() {
        let existing = ClientConfig::new("http://localhost:3000");
        let config = ClientConfigBuilder::from_config(existing)
            .query("health", "/health")
            .build()
            .unwrap();

        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.queries.len(), 1);
    }
}
