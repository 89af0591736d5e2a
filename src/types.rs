use crate::analysis::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// HTTP methods the backend contract uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Reads are the only requests eligible for automatic retry
    pub fn is_read(self) -> bool {
        self == HttpMethod::Get
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Write methods accepted by a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl From<MutationMethod> for HttpMethod {
    fn from(method: MutationMethod) -> Self {
        match method {
            MutationMethod::Post => HttpMethod::Post,
            MutationMethod::Put => HttpMethod::Put,
            MutationMethod::Patch => HttpMethod::Patch,
            MutationMethod::Delete => HttpMethod::Delete,
        }
    }
}

/// One request as handed to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the configured base URL, e.g. `/api/containers`
    pub endpoint: String,
    pub body: Option<Value>,
    pub correlation_id: Option<String>,
}

impl ApiRequest {
    pub fn new<S: Into<String>>(method: HttpMethod, endpoint: S) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            correlation_id: None,
        }
    }

    pub fn get<S: Into<String>>(endpoint: S) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    /// Attach a JSON body. `null` is treated as no body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = if body.is_null() { None } else { Some(body) };
        self
    }

    pub fn with_correlation_id<S: Into<String>>(mut self, correlation_id: S) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Raw HTTP response returned by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: String) -> Self {
        Self { status, body }
    }

    /// Check if response indicates success (2xx status)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// State of one read query, owned by a single controller
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// Last successful payload, or the seed value before the first success
    pub data: Option<T>,
    /// True only while the very first fetch is in flight
    pub loading: bool,
    /// True while a fetch after the first resolution is in flight
    pub is_refetching: bool,
    pub error: Option<ApiError>,
}

impl<T> QueryState<T> {
    pub fn seeded(initial_data: Option<T>) -> Self {
        Self {
            data: initial_data,
            loading: false,
            is_refetching: false,
            error: None,
        }
    }

    /// Whether any fetch is currently in flight
    pub fn is_fetching(&self) -> bool {
        self.loading || self.is_refetching
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::seeded(None)
    }
}

/// State of one write operation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<ApiError>,
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Aggregated state of a parallel query set
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelQueryState<T> {
    /// Last successful payload per key
    pub data: HashMap<String, T>,
    /// Latest failure per key; cleared by that key's next success
    pub errors: HashMap<String, ApiError>,
    /// True from the start of a round until every member has settled
    pub loading: bool,
}

impl<T> ParallelQueryState<T> {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl<T> Default for ParallelQueryState<T> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            loading: false,
        }
    }
}
