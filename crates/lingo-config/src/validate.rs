use crate::config::ServerConfig;
use crate::error::ConfigError;

/// Validate a [`ServerConfig`], returning all detected violations.
///
/// Returns `Ok(())` when the config is valid, or `Err` with a
/// vector of every validation error found.
pub fn validate(config: &ServerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // timeout_secs: 1–600
    if config.timeout_secs == 0 || config.timeout_secs > 600 {
        errors.push(ConfigError::Validation {
            field: "timeout_secs".to_string(),
            message: format!("must be 1\u{2013}600, got {}", config.timeout_secs),
        });
    }

    // restore.program: non-empty
    if config.restore.program.is_empty() {
        errors.push(ConfigError::Validation {
            field: "restore.program".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    // restore.concurrency: 0 (auto) or <= 64
    if config.restore.concurrency > 64 {
        errors.push(ConfigError::Validation {
            field: "restore.concurrency".to_string(),
            message: format!(
                "must be 0 (auto) or \u{2264} 64, got {}",
                config.restore.concurrency,
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
