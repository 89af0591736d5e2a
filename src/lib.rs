//! Console Query - request orchestration for a dashboard-style API client
//!
//! This crate executes HTTP calls against a JSON backend with deadlines,
//! bounded retries and cancellation, and owns the lifecycle of read queries,
//! write mutations and parallel query sets on behalf of their consumers.

// Core modules
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Request pipeline
pub mod analysis;
pub mod execution;
pub mod http;

// Lifecycle owners
pub mod controllers;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use analysis::{classify, ApiError, ApiResult, ErrorKind, TransportFailure};
pub use config::{ClientConfig, ClientConfigBuilder, QueryDescriptor, RequestOptions};
pub use controllers::{
    MutationController, MutationOptions, ParallelOptions, ParallelQuerySet, QueryController, QueryOptions,
};
pub use error::{ConsoleError, Result};
pub use execution::{new_correlation_id, RequestExecutor};
pub use http::ReqwestTransport;
pub use traits::Transport;
pub use types::{
    ApiRequest, HttpMethod, HttpResponse, MutationMethod, MutationState, ParallelQueryState, QueryState,
};
