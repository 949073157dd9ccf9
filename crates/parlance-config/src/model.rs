// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Parlance configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; a deployment without `[[bots]]` starts but admits no turns.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParlanceConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Web search middleware settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Configured bots, each tied to a model and a middleware pipeline.
    #[serde(default)]
    pub bots: Vec<BotConfig>,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the service instance.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "parlance".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long a turn read blocks for completion before returning the
    /// turn in its current state.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            wait_timeout_secs: default_wait_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_wait_timeout_secs() -> u64 {
    30
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("parlance").join("parlance.db"))
        .and_then(|p| p.to_str().map(str::to_string))
        .unwrap_or_else(|| "parlance.db".to_string())
}

/// Web search middleware configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Instant Answer API endpoint used by the search middleware.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://api.duckduckgo.com/".to_string()
}

/// One configured bot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Stable numeric identity referenced by conversations.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Model name in `provider:provider_model` form.
    pub model: String,

    /// Ordered middleware references; options are validated at startup.
    #[serde(default)]
    pub middlewares: Vec<BotMiddlewareConfig>,

    /// What a middleware failure does to the turn: "fail" or "skip".
    #[serde(default = "default_failure_policy")]
    pub middleware_failure_policy: String,
}

fn default_failure_policy() -> String {
    "fail".to_string()
}

/// A middleware reference on a bot: registry name plus raw options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotMiddlewareConfig {
    pub name: String,

    /// Unvalidated option document, passed to the middleware's validator.
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}
