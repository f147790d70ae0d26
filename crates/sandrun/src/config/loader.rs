//! Configuration file loading for sandrun
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError, LanguageId};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = self.defaults.zero_limit() {
            return Err(ConfigError::Invalid(format!(
                "defaults.{name} must be positive"
            )));
        }
        if self.max_source_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_source_bytes must be positive".to_owned(),
            ));
        }
        if self.workspace.prefix.is_empty() || self.workspace.prefix.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "workspace prefix {:?} must be non-empty and contain no '/'",
                self.workspace.prefix
            )));
        }

        for (id, lang) in &self.languages {
            if id.parse::<LanguageId>().is_err() {
                return Err(ConfigError::UnknownLanguage(id.clone()));
            }
            if let Some(ref interpreter) = lang.interpreter
                && interpreter.as_os_str().is_empty()
            {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has empty interpreter"
                )));
            }
            if let Some(ref limits) = lang.limits
                && [
                    limits.timeout_seconds,
                    limits.memory_limit_mb,
                    limits.cpu_time_limit_seconds,
                ]
                .contains(&Some(0))
            {
                return Err(ConfigError::Invalid(format!(
                    "language '{id}' has a zero limit"
                )));
            }
        }

        Ok(())
    }
}
