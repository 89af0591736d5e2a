//! Normalizes transport failures, timeouts and non-2xx responses into
//! [`ApiError`] values, and derives the message that is safe to show users.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Result of a request as seen by controllers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Shown whenever the server was never reached or failed on its side
const UNAVAILABLE_MESSAGE: &str = "The service is temporarily unavailable. Please try again later.";

/// Shown for client errors without a usable backend reason
const GENERIC_MESSAGE: &str = "The request could not be completed.";

/// Longest backend reason echoed back to users
const MAX_REASON_CHARS: usize = 200;

/// Payload fields checked, in order, for a short backend reason
const REASON_FIELDS: [&str; 3] = ["message", "error", "detail"];

/// Broad class of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response was received (DNS, connection refused, reset)
    Transport,
    /// The deadline elapsed before the call settled
    Timeout,
    /// A response arrived with a non-2xx status
    Status,
    /// A body could not be encoded or decoded as JSON
    Serialization,
    /// The request could not be built locally, so it was never sent
    Request,
}

/// Normalized request failure.
///
/// Immutable once built. `status_code` is `None` when the request never
/// reached the server.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status_code: Option<u16>,
    payload: Option<Value>,
    correlation_id: Option<String>,
}

/// Raw failure reported by a transport before classification
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// A failure that has already been classified upstream
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ApiError {
    /// Error for a response that arrived with a non-2xx status
    pub fn from_status<S: Into<String>>(
        status: u16,
        message: S,
        payload: Option<Value>,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::Status,
            message: message.into(),
            status_code: Some(status),
            payload,
            correlation_id,
        }
    }

    /// Error for a body that could not be encoded or decoded
    pub fn serialization<S: Into<String>>(
        status: Option<u16>,
        message: S,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::Serialization,
            message: message.into(),
            status_code: status,
            payload: None,
            correlation_id,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Diagnostic text. Not meant for end users, see [`ApiError::user_message`].
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// Whether a read that failed this way may succeed when retried
    pub fn is_transient(&self) -> bool {
        match self.kind {
            ErrorKind::Transport | ErrorKind::Timeout => true,
            ErrorKind::Status => matches!(self.status_code, Some(502..=504)),
            ErrorKind::Serialization | ErrorKind::Request => false,
        }
    }

    /// Non-technical message suitable for display.
    ///
    /// Never leaks diagnostics for server-side or transport failures. For
    /// 4xx responses, a short `message`/`error`/`detail` string from the
    /// payload is echoed when present.
    pub fn user_message(&self) -> String {
        if self.kind == ErrorKind::Request {
            return GENERIC_MESSAGE.to_string();
        }
        match self.status_code {
            None => UNAVAILABLE_MESSAGE.to_string(),
            Some(status) if status >= 500 => UNAVAILABLE_MESSAGE.to_string(),
            Some(status) if (400..500).contains(&status) => self
                .backend_reason()
                .unwrap_or(GENERIC_MESSAGE)
                .to_string(),
            Some(_) => GENERIC_MESSAGE.to_string(),
        }
    }

    fn backend_reason(&self) -> Option<&str> {
        let object = self.payload.as_ref()?.as_object()?;
        REASON_FIELDS
            .iter()
            .filter_map(|field| object.get(*field).and_then(Value::as_str))
            .map(str::trim)
            .find(|reason| !reason.is_empty() && reason.chars().count() <= MAX_REASON_CHARS)
    }
}

/// Turn any transport failure into an [`ApiError`].
///
/// Already-classified errors pass through unchanged, including their
/// correlation id.
pub fn classify<F>(failure: F, correlation_id: Option<&str>) -> ApiError
where
    F: Into<TransportFailure>,
{
    let failure = failure.into();
    let kind = match &failure {
        TransportFailure::Api(_) => None,
        TransportFailure::Timeout(_) => Some(ErrorKind::Timeout),
        TransportFailure::Http(e) if e.is_timeout() => Some(ErrorKind::Timeout),
        TransportFailure::Http(e) if e.is_builder() => Some(ErrorKind::Request),
        TransportFailure::InvalidRequest(_) => Some(ErrorKind::Request),
        TransportFailure::Http(_) | TransportFailure::Connect(_) => Some(ErrorKind::Transport),
    };

    match (failure, kind) {
        (TransportFailure::Api(error), _) => error,
        (failure, kind) => ApiError {
            kind: kind.unwrap_or(ErrorKind::Transport),
            message: failure.to_string(),
            status_code: None,
            payload: None,
            correlation_id: correlation_id.map(str::to_string),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_passes_through_unchanged() {
        let original = ApiError::from_status(404, "not found", None, Some("q-1".to_string()));
        let classified = classify(original.clone(), Some("other"));
        assert_eq!(classified, original);
        assert_eq!(classified.correlation_id(), Some("q-1"));
    }

    #[test]
    fn test_connection_failure_has_no_status() {
        let error = classify(TransportFailure::Connect("refused".to_string()), Some("q-2"));
        assert_eq!(error.kind(), ErrorKind::Transport);
        assert_eq!(error.status_code(), None);
        assert!(error.payload().is_none());
        assert_eq!(error.correlation_id(), Some("q-2"));
        assert!(error.message().contains("refused"));
        assert!(error.is_transient());
    }

    #[test]
    fn test_unbuildable_request_is_not_transient() {
        let error = classify(
            TransportFailure::InvalidRequest("cannot build URL for 'http://[::1'".to_string()),
            Some("q-3"),
        );
        assert_eq!(error.kind(), ErrorKind::Request);
        assert_eq!(error.status_code(), None);
        assert!(!error.is_transient());
        assert_eq!(error.user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn test_timeout_is_named_in_message() {
        let error = classify(TransportFailure::Timeout(Duration::from_millis(10)), None);
        assert!(error.is_timeout());
        assert_eq!(error.status_code(), None);
        assert!(error.message().contains("timed out after 10ms"));
        assert!(error.correlation_id().is_none());
    }

    #[test]
    fn test_transient_statuses() {
        for status in [502, 503, 504] {
            assert!(ApiError::from_status(status, "gateway", None, None).is_transient());
        }
        for status in [400, 404, 409, 500, 501] {
            assert!(!ApiError::from_status(status, "nope", None, None).is_transient());
        }
        assert!(!ApiError::serialization(Some(200), "bad json", None).is_transient());
    }

    #[test]
    fn test_user_message_hides_server_details() {
        let payload = json!({"message": "panic at db.rs:42"});
        let error = ApiError::from_status(500, "HTTP 500", Some(payload), None);
        assert_eq!(error.user_message(), UNAVAILABLE_MESSAGE);

        let error = classify(TransportFailure::Connect("dns failure for internal-host".into()), None);
        assert_eq!(error.user_message(), UNAVAILABLE_MESSAGE);
    }

    #[test]
    fn test_user_message_echoes_short_client_reason() {
        let payload = json!({"error": "Project name already taken"});
        let error = ApiError::from_status(409, "HTTP 409", Some(payload), None);
        assert_eq!(error.user_message(), "Project name already taken");

        let payload = json!({"message": "  ", "detail": "Container is stopped"});
        let error = ApiError::from_status(400, "HTTP 400", Some(payload), None);
        assert_eq!(error.user_message(), "Container is stopped");
    }

    #[test]
    fn test_user_message_falls_back_for_client_errors() {
        let error = ApiError::from_status(404, "HTTP 404", None, None);
        assert_eq!(error.user_message(), GENERIC_MESSAGE);

        let long_reason = "x".repeat(MAX_REASON_CHARS + 1);
        let error = ApiError::from_status(400, "HTTP 400", Some(json!({"message": long_reason})), None);
        assert_eq!(error.user_message(), GENERIC_MESSAGE);

        let error = ApiError::from_status(422, "HTTP 422", Some(json!("plain text")), None);
        assert_eq!(error.user_message(), GENERIC_MESSAGE);
    }
}
