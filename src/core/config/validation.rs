use super::BridgeConfig;
use crate::core::catalog::NONE_TRANSFORMATION;
use crate::core::error::ConfigError;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &BridgeConfig) -> Result<(), ConfigError> {
        if config.stylesheets_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "stylesheets_dir cannot be empty".to_string(),
            ));
        }

        if config.engine.program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "engine.program cannot be empty".to_string(),
            ));
        }

        if config.engine.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "engine.timeout_secs must be greater than zero".to_string(),
            ));
        }

        for (name, entry) in &config.transformation {
            if name == NONE_TRANSFORMATION {
                return Err(ConfigError::Invalid(format!(
                    "transformation name '{}' is reserved",
                    NONE_TRANSFORMATION
                )));
            }
            if entry.label.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "transformation.{}.label cannot be empty",
                    name
                )));
            }
        }

        Ok(())
    }
}
