use crate::analysis::TransportFailure;
use crate::types::ApiRequest;
use reqwest::{Client, Request};
use url::Url;

/// Header carrying the controller's correlation id
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Turns an [`ApiRequest`] into a `reqwest::Request` against the base URL
#[derive(Clone)]
pub struct RequestBuilderImpl {
    client: Client,
    base_url: Url,
}

impl RequestBuilderImpl {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Resolve an endpoint path against the base URL, keeping any base path prefix
    pub fn resolve_url(&self, endpoint: &str) -> Result<Url, TransportFailure> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if endpoint.starts_with('/') {
            format!("{}{}", base, endpoint)
        } else {
            format!("{}/{}", base, endpoint)
        };

        Url::parse(&joined).map_err(|e| {
            TransportFailure::InvalidRequest(format!("cannot build URL for '{}': {}", endpoint, e))
        })
    }

    pub fn build_request(&self, request: &ApiRequest) -> Result<Request, TransportFailure> {
        let url = self.resolve_url(&request.endpoint)?;
        let mut builder = self.client.request(request.method.into(), url);

        if let Some(correlation_id) = &request.correlation_id {
            builder = builder.header(CORRELATION_HEADER, correlation_id);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.build().map_err(TransportFailure::from)
    }
}
