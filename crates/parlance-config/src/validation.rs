// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as unique bot ids and a known failure policy. Errors
//! are collected, not fail-fast.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::ParlanceConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)`
/// with every collected validation error.
pub fn validate_config(config: &ParlanceConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    }

    if config.gateway.wait_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.wait_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.search.endpoint.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "search.endpoint must not be empty".to_string(),
        });
    }

    let mut seen_ids = HashSet::new();
    for bot in &config.bots {
        if !seen_ids.insert(bot.id) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate bot id `{}` in [[bots]] array", bot.id),
            });
        }
    }

    for (i, bot) in config.bots.iter().enumerate() {
        if bot.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("bots[{i}].name must not be empty"),
            });
        }
        if !bot.model.contains(':') {
            errors.push(ConfigError::Validation {
                message: format!(
                    "bots[{i}].model `{}` must be in provider:provider_model form",
                    bot.model
                ),
            });
        }
        if bot.middleware_failure_policy != "fail" && bot.middleware_failure_policy != "skip" {
            errors.push(ConfigError::Validation {
                message: format!(
                    "bots[{i}].middleware_failure_policy must be `fail` or `skip`, got `{}`",
                    bot.middleware_failure_policy
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BotConfig;

    fn bot(id: i64, name: &str, model: &str) -> BotConfig {
        BotConfig {
            id,
            name: name.to_string(),
            model: model.to_string(),
            middlewares: vec![],
            middleware_failure_policy: "fail".to_string(),
        }
    }

    #[test]
    fn default_config_validates() {
        let config = ParlanceConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = ParlanceConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn duplicate_bot_ids_fail_validation() {
        let mut config = ParlanceConfig::default();
        config.bots = vec![
            bot(1, "helper", "openai:gpt-4"),
            bot(1, "other", "custom:llama"),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("duplicate bot id"))));
    }

    #[test]
    fn model_without_provider_prefix_fails_validation() {
        let mut config = ParlanceConfig::default();
        config.bots = vec![bot(1, "helper", "gpt-4")];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("provider:provider_model"))));
    }

    #[test]
    fn unknown_failure_policy_fails_validation() {
        let mut config = ParlanceConfig::default();
        let mut b = bot(1, "helper", "openai:gpt-4");
        b.middleware_failure_policy = "explode".to_string();
        config.bots = vec![b];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("middleware_failure_policy"))));
    }

    #[test]
    fn zero_wait_timeout_fails_validation() {
        let mut config = ParlanceConfig::default();
        config.gateway.wait_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("wait_timeout_secs"))));
    }
}
