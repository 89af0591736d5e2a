use crate::analysis::TransportFailure;
use crate::config::ClientConfig;
use crate::error::{ConsoleError, Result};
use crate::http::{RequestBuilderImpl, ResponseConverterImpl};
use crate::traits::Transport;
use crate::types::{ApiRequest, HttpResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::trace;
use url::Url;

/// Transport backed by a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    request_builder: RequestBuilderImpl,
    response_converter: ResponseConverterImpl,
}

impl ReqwestTransport {
    /// Create a new transport from client configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;

        let follow_redirects = config.follow_redirects.unwrap_or(true);

        let mut builder = Client::builder()
            .default_headers(Self::default_headers(config)?)
            .redirect(if follow_redirects {
                reqwest::redirect::Policy::default()
            } else {
                reqwest::redirect::Policy::none()
            });

        if let Some(connect_timeout_ms) = config.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(connect_timeout_ms));
        }

        let client = builder.build()?;
        let request_builder = RequestBuilderImpl::new(client.clone(), base_url);

        Ok(Self {
            client,
            request_builder,
            response_converter: ResponseConverterImpl::new(),
        })
    }

    fn default_headers(config: &ClientConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                ConsoleError::invalid_config(format!("Invalid header name: {}", name))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                ConsoleError::invalid_config(format!("Invalid value for header {}", name))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<HttpResponse, TransportFailure> {
        let built = self.request_builder.build_request(request)?;
        trace!(method = %request.method, url = %built.url(), "sending request");

        let response = self.client.execute(built).await?;
        self.response_converter.convert_response(response).await
    }
}
