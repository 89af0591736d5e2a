use crate::analysis::TransportFailure;
use crate::types::HttpResponse;
use reqwest::Response;
use tracing::trace;

/// Converts a `reqwest::Response` into our [`HttpResponse`]
#[derive(Clone)]
pub struct ResponseConverterImpl;

impl ResponseConverterImpl {
    pub fn new() -> Self {
        Self
    }

    pub async fn convert_response(&self, response: Response) -> Result<HttpResponse, TransportFailure> {
        let status = response.status().as_u16();
        trace!(status, url = %response.url(), "response received");

        // A body that stops mid-stream is a transport failure, not a status error
        let body = response.text().await?;

        Ok(HttpResponse::new(status, body))
    }
}

impl Default for ResponseConverterImpl {
    fn default() -> Self {
        Self::new()
    }
}
