//! Stateful owners of query and mutation lifecycles.
//!
//! Constructing a controller corresponds to a view mounting it; dropping it
//! (or calling `teardown`) corresponds to unmounting. After teardown no
//! state write and no callback ever happens again.

mod lifecycle;
pub mod mutation;
pub mod options;
pub mod parallel;
pub mod query;

pub use mutation::MutationController;
pub use options::{ErrorCallback, MutationOptions, ParallelOptions, QueryOptions, SuccessCallback};
pub use parallel::ParallelQuerySet;
pub use query::QueryController;
