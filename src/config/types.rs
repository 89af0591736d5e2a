use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default per-attempt deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default pause between retry attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Client configuration, usually loaded from `console-query.toml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Base URL every endpoint is resolved against
    pub base_url: String,
    /// Headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Whether to follow redirects (default: true)
    pub follow_redirects: Option<bool>,
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
    /// Request options used when a query does not set its own
    #[serde(default)]
    pub defaults: RequestOptions,
    /// Named reads run together by `batch`
    #[serde(default)]
    pub queries: Vec<QueryEntry>,
}

impl ClientConfig {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            headers: HashMap::new(),
            follow_redirects: None,
            connect_timeout_ms: None,
            defaults: RequestOptions::default(),
            queries: Vec::new(),
        }
    }

    /// Resolve the configured queries against `[defaults]`
    pub fn descriptors(&self) -> Vec<QueryDescriptor> {
        self.queries
            .iter()
            .map(|entry| entry.resolve(&self.defaults))
            .collect()
    }
}

/// Per-request timing and retry options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Deadline for each attempt
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Extra attempts for transient read failures
    pub retries: u32,
    /// Pause before each retry
    #[serde(rename = "retry_delay_ms", with = "millis")]
    pub retry_delay: Duration,
}

impl RequestOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// A named read inside a parallel set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    /// Unique within its set
    pub key: String,
    /// Path relative to the base URL
    pub endpoint: String,
    pub options: RequestOptions,
}

impl QueryDescriptor {
    pub fn new<K: Into<String>, E: Into<String>>(key: K, endpoint: E) -> Self {
        Self {
            key: key.into(),
            endpoint: endpoint.into(),
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// `[[queries]]` entry as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryEntry {
    pub key: String,
    pub endpoint: String,
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

impl QueryEntry {
    /// Fill unset options from `defaults`
    pub fn resolve(&self, defaults: &RequestOptions) -> QueryDescriptor {
        let options = RequestOptions {
            timeout: self
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            retries: self.retries.unwrap_or(defaults.retries),
            retry_delay: self
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
        };

        QueryDescriptor {
            key: self.key.clone(),
            endpoint: self.endpoint.clone(),
            options,
        }
    }
}

/// Serde adapter storing a `Duration` as whole milliseconds
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
