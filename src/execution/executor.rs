use crate::analysis::{classify, ApiError, ApiResult, TransportFailure};
use crate::config::{ClientConfig, RequestOptions};
use crate::error::Result;
use crate::http::ReqwestTransport;
use crate::traits::Transport;
use crate::types::{ApiRequest, HttpResponse};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Performs single logical HTTP calls with a deadline per attempt, bounded
/// retries for transient read failures, and optional cancellation.
///
/// Cheap to clone; clones share the underlying transport.
#[derive(Clone)]
pub struct RequestExecutor<C = ReqwestTransport> {
    transport: C,
}

impl RequestExecutor<ReqwestTransport> {
    /// Executor over a reqwest transport built from `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(ReqwestTransport::new(config)?))
    }
}

impl<C: Transport> RequestExecutor<C> {
    pub fn new(transport: C) -> Self {
        Self { transport }
    }

    /// Run `request` to completion.
    ///
    /// Only GET requests are retried, and only for transient failures
    /// (transport errors, timeouts, 502/503/504). An always-failing read
    /// makes exactly `options.retries + 1` attempts.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        options: &RequestOptions,
    ) -> ApiResult<T> {
        let mut remaining = if request.method.is_read() {
            options.retries
        } else {
            0
        };
        let mut attempt: u32 = 1;

        loop {
            debug!(
                method = %request.method,
                endpoint = %request.endpoint,
                correlation_id = request.correlation_id.as_deref().unwrap_or("-"),
                attempt,
                "dispatching request"
            );

            match self.attempt(request, options).await {
                Ok(value) => return Ok(value),
                Err(error) if remaining > 0 && error.is_transient() => {
                    warn!(
                        endpoint = %request.endpoint,
                        attempt,
                        remaining,
                        status = error.status_code().unwrap_or(0),
                        error = %error,
                        "transient failure, retrying"
                    );
                    if !options.retry_delay.is_zero() {
                        tokio::time::sleep(options.retry_delay).await;
                    }
                    remaining -= 1;
                    attempt += 1;
                }
                Err(error) => {
                    warn!(
                        method = %request.method,
                        endpoint = %request.endpoint,
                        attempt,
                        status = error.status_code().unwrap_or(0),
                        error = %error,
                        "request failed"
                    );
                    return Err(error);
                }
            }
        }
    }

    /// Like [`execute`](Self::execute), abandoned as soon as `cancel` fires.
    ///
    /// Returns `None` when cancelled before settlement; a cancelled call is
    /// not an error.
    pub async fn execute_cancellable<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        options: &RequestOptions,
        cancel: &CancellationToken,
    ) -> Option<ApiResult<T>> {
        if cancel.is_cancelled() {
            debug!(endpoint = %request.endpoint, "request cancelled before dispatch");
            return None;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(endpoint = %request.endpoint, "request cancelled in flight");
                None
            }
            result = self.execute(request, options) => Some(result),
        }
    }

    /// Convenience GET without cancellation
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, options: &RequestOptions) -> ApiResult<T> {
        self.execute(&ApiRequest::get(endpoint), options).await
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        options: &RequestOptions,
    ) -> ApiResult<T> {
        let correlation_id = request.correlation_id.as_deref();

        let response = match tokio::time::timeout(options.timeout, self.transport.send(request)).await {
            Err(_elapsed) => {
                return Err(classify(TransportFailure::Timeout(options.timeout), correlation_id))
            }
            Ok(Err(failure)) => return Err(classify(failure, correlation_id)),
            Ok(Ok(response)) => response,
        };

        decode_response(request, response)
    }
}

/// 2xx bodies decode into `T`; anything else becomes a status error
fn decode_response<T: DeserializeOwned>(request: &ApiRequest, response: HttpResponse) -> ApiResult<T> {
    let correlation_id = request.correlation_id.clone();

    if !response.is_success() {
        return Err(ApiError::from_status(
            response.status,
            format!(
                "{} {} failed with status {}",
                request.method, request.endpoint, response.status
            ),
            error_payload(&response.body),
            correlation_id,
        ));
    }

    let body = if response.body.trim().is_empty() {
        "null"
    } else {
        response.body.as_str()
    };

    serde_json::from_str(body).map_err(|e| {
        ApiError::serialization(
            Some(response.status),
            format!(
                "invalid JSON from {} {}: {}",
                request.method, request.endpoint, e
            ),
            correlation_id,
        )
    })
}

/// JSON error body, or the raw text wrapped as a JSON string
fn error_payload(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}
