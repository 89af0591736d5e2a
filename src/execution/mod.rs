//! Request execution: deadlines, retries and cancellation for single calls

pub mod correlation;
pub mod executor;

pub use correlation::new_correlation_id;
pub use executor::RequestExecutor;
