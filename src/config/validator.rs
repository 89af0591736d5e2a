use crate::config::types::ClientConfig;
use crate::error::{ConsoleError, Result};
use crate::traits::ConfigValidator;
use std::collections::HashSet;
use std::path::Path;

/// Configuration validator implementation
pub struct ConfigValidatorImpl;

impl ConfigValidator for ConfigValidatorImpl {
    type Config = ClientConfig;

    fn validate(&self, config: &ClientConfig) -> Result<()> {
        self.validate_with_context(config, "configuration")
    }
}

impl ConfigValidatorImpl {
    pub fn new() -> Self {
        Self
    }

    /// Validation naming the config source in error messages
    pub fn validate_with_context<P: AsRef<Path>>(
        &self,
        config: &ClientConfig,
        config_path: P,
    ) -> Result<()> {
        let source = config_path.as_ref().to_string_lossy();

        let base_url = url::Url::parse(&config.base_url).map_err(|e| {
            ConsoleError::invalid_config(format!(
                "Invalid base_url '{}' in {}: {}",
                config.base_url, source, e
            ))
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConsoleError::invalid_config(format!(
                "base_url in {} must use http or https, got '{}'",
                source,
                base_url.scheme()
            )));
        }

        let mut seen = HashSet::new();
        for entry in &config.queries {
            if entry.key.trim().is_empty() {
                return Err(ConsoleError::invalid_config(format!(
                    "A [[queries]] entry in {} has an empty key",
                    source
                )));
            }

            if !entry.endpoint.starts_with('/') {
                return Err(ConsoleError::invalid_config(format!(
                    "Query '{}' in {} has endpoint '{}'; endpoints must start with '/'",
                    entry.key, source, entry.endpoint
                )));
            }

            if !seen.insert(entry.key.as_str()) {
                return Err(ConsoleError::duplicate_key(entry.key.clone()));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidatorImpl {
    fn default() -> Self {
        Self::new()
    }
}
