// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Parlance configuration system.

use parlance_config::diagnostic::ConfigError;
use parlance_config::model::ParlanceConfig;
use parlance_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_parlance_config() {
    let toml = r#"
[agent]
name = "parlance-test"
log_level = "debug"

[gateway]
host = "0.0.0.0"
port = 9090
wait_timeout_secs = 10

[storage]
database_path = "/tmp/parlance-test.db"

[search]
endpoint = "https://search.example.com/"

[[bots]]
id = 1
name = "helper"
model = "openai:gpt-4"
middleware_failure_policy = "skip"

[[bots.middlewares]]
name = "search"
options = { limit = 5 }

[[bots]]
id = 2
name = "quiet"
model = "custom:llama"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "parlance-test");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.gateway.port, 9090);
    assert_eq!(config.gateway.wait_timeout_secs, 10);
    assert_eq!(config.storage.database_path, "/tmp/parlance-test.db");
    assert_eq!(config.search.endpoint, "https://search.example.com/");

    assert_eq!(config.bots.len(), 2);
    let helper = &config.bots[0];
    assert_eq!(helper.id, 1);
    assert_eq!(helper.name, "helper");
    assert_eq!(helper.model, "openai:gpt-4");
    assert_eq!(helper.middleware_failure_policy, "skip");
    assert_eq!(helper.middlewares.len(), 1);
    assert_eq!(helper.middlewares[0].name, "search");
    assert_eq!(
        helper.middlewares[0].options.get("limit"),
        Some(&serde_json::json!(5))
    );

    let quiet = &config.bots[1];
    assert!(quiet.middlewares.is_empty());
    assert_eq!(quiet.middleware_failure_policy, "fail");
}

/// An empty document falls back to compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.agent.name, "parlance");
    assert_eq!(config.agent.log_level, "info");
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.wait_timeout_secs, 30);
    assert_eq!(config.search.endpoint, "https://api.duckduckgo.com/");
    assert!(config.bots.is_empty());
    assert!(!config.storage.database_path.is_empty());
}

/// Unknown keys are rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_gateway_produces_error() {
    let toml = r#"
[gateway]
prot = 9090
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("prot"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// load_and_validate_str surfaces unknown keys as UnknownKey diagnostics
/// with a typo suggestion.
#[test]
fn unknown_key_diagnostic_carries_suggestion() {
    let toml = r#"
[storage]
databse_path = "/tmp/x.db"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce diagnostics");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { key, suggestion, .. }
            if key == "databse_path" && suggestion.as_deref() == Some("database_path")
    )));
}

/// Semantic validation runs after deserialization.
#[test]
fn semantic_validation_rejects_duplicate_bot_ids() {
    let toml = r#"
[[bots]]
id = 1
name = "first"
model = "openai:gpt-4"

[[bots]]
id = 1
name = "second"
model = "custom:llama"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::Validation { message } if message.contains("duplicate bot id")
    )));
}

/// A bot missing a required field is a missing key diagnostic.
#[test]
fn bot_without_model_is_a_missing_key() {
    let toml = r#"
[[bots]]
id = 1
name = "incomplete"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce diagnostics");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::MissingKey { key } if key == "model")));
}

/// The model struct serializes back to TOML, keeping round-trip configs.
#[test]
fn default_config_round_trips_through_toml() {
    let config = ParlanceConfig::default();
    let rendered = toml::to_string(&config).expect("defaults should serialize");
    let reparsed = load_config_from_str(&rendered).expect("rendered TOML should parse");
    assert_eq!(reparsed.agent.name, config.agent.name);
    assert_eq!(reparsed.gateway.port, config.gateway.port);
}
