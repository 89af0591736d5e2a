use crate::analysis::TransportFailure;
use crate::error::Result;
use crate::types::{ApiRequest, HttpResponse};
use std::future::Future;

/// Trait for the wire layer under the request executor.
///
/// Implementations send exactly one request and report what happened
/// without interpreting status codes or applying deadlines; that is the
/// executor's job.
pub trait Transport: Send + Sync + Clone + 'static {
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = std::result::Result<HttpResponse, TransportFailure>> + Send;
}

/// Trait for configuration validation
pub trait ConfigValidator: Send + Sync {
    type Config;

    /// Validate configuration
    fn validate(&self, config: &Self::Config) -> Result<()>;
}
