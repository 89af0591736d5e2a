pub mod builder;
pub mod loader;
pub mod types;
pub mod validator;

pub use builder::ClientConfigBuilder;
pub use loader::{ConfigLoader, DefaultConfigLoader, DEFAULT_CONFIG_FILE};
pub use types::{ClientConfig, QueryDescriptor, QueryEntry, RequestOptions};
pub use validator::ConfigValidatorImpl;
