//! Failure classification
//!
//! Every failure a request can produce is normalized here into a single
//! [`ApiError`]. Controllers only ever see this type.

pub mod error_classifier;

pub use error_classifier::{classify, ApiError, ApiResult, ErrorKind, TransportFailure};
