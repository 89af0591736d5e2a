#[cfg(test)]
pub mod mocks;

#[cfg(test)]
pub use mocks::{mock_executor, MockReply, MockTransport};
