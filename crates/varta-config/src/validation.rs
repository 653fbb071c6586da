// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and non-zero limits.

use crate::diagnostic::ConfigError;
use crate::model::VartaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &VartaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.media_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.media_dir must not be empty".to_string(),
        });
    }

    if config.gemini.poll_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "gemini.poll_interval_secs must be at least 1".to_string(),
        });
    }

    for (key, value) in [
        ("limits.daily_image_limit", config.limits.daily_image_limit),
        ("limits.daily_video_limit", config.limits.daily_video_limit),
    ] {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be at least 1, got 0"),
            });
        }
    }

    for (key, value) in [
        ("gemini.fast_model", &config.gemini.fast_model),
        ("gemini.pro_model", &config.gemini.pro_model),
        ("gemini.image_model", &config.gemini.image_model),
        ("gemini.video_model", &config.gemini.video_model),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = VartaConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_limit_is_rejected() {
        let mut config = VartaConfig::default();
        config.limits.daily_video_limit = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("daily_video_limit"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = VartaConfig::default();
        config.storage.database_path = "  ".into();
        config.gemini.fast_model = String::new();
        config.limits.daily_image_limit = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
