// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Parlance workspace.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ParlanceError;

/// Provider key for OpenAI-hosted models.
pub const MODEL_PROVIDER_OPENAI: &str = "openai";
/// Provider key for user-supplied custom HTTP endpoints.
pub const MODEL_PROVIDER_CUSTOM: &str = "custom";

/// Lifecycle status of a conversation turn.
///
/// The integer codes are part of the HTTP contract:
/// `0=Pending, 1=Processing, 2=Completed, 3=Error`. The derived ordering
/// (Pending < Processing < Completed < Error by declaration) backs the
/// monotone status guard in the store: a turn's status never regresses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(try_from = "i64", into = "i64")]
pub enum TurnStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl TurnStatus {
    /// Wire code exposed to HTTP callers and stored in SQLite.
    pub fn code(self) -> i64 {
        match self {
            TurnStatus::Pending => 0,
            TurnStatus::Processing => 1,
            TurnStatus::Completed => 2,
            TurnStatus::Error => 3,
        }
    }

    /// A processed turn is terminal: the conversation may accept a new
    /// submission.
    pub fn is_processed(self) -> bool {
        matches!(self, TurnStatus::Completed | TurnStatus::Error)
    }
}

impl From<TurnStatus> for i64 {
    fn from(status: TurnStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i64> for TurnStatus {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, String> {
        match code {
            0 => Ok(TurnStatus::Pending),
            1 => Ok(TurnStatus::Processing),
            2 => Ok(TurnStatus::Completed),
            3 => Ok(TurnStatus::Error),
            other => Err(format!("invalid turn status code: {other}")),
        }
    }
}

/// One request/response exchange within a conversation.
///
/// Owned exclusively by its processing task until terminal, immutable
/// afterwards. `response` is non-empty only in a terminal state; on Error
/// it carries the failure description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvTurn {
    pub id: i64,
    pub conversation_id: String,
    pub bot_id: i64,
    pub app_id: i64,
    pub user_identity: String,
    pub request: String,
    pub response: String,
    pub status: TurnStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl ConvTurn {
    /// True once the turn reached Completed or Error.
    pub fn is_processed(&self) -> bool {
        self.status.is_processed()
    }
}

/// A conversation between one bot and one user identity.
///
/// `last_turn_id` is the single authoritative pointer to the most recent
/// turn. Admission control reads the pointed-at turn's status; history
/// order is never consulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub bot_id: i64,
    pub app_id: i64,
    pub user_identity: String,
    pub lang: String,
    pub last_turn_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Functional role of a model endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModelFunction {
    Chat,
    Embedding,
}

/// Request template for custom-endpoint models.
///
/// String values in `data` may contain an `{{input}}` placeholder which the
/// provider substitutes with the assembled prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomRequest {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

fn default_method() -> String {
    "POST".to_string()
}

/// Response extraction rule for custom-endpoint models: a dot-separated
/// path into the response JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomResponse {
    pub path: String,
}

/// Provider-specific configuration document carried by custom models.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomConfig {
    #[serde(default)]
    pub request: CustomRequest,
    #[serde(default)]
    pub response: CustomResponse,
}

/// Provider-agnostic description of an LLM endpoint, including the pricing
/// used for cost accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub id: i64,
    pub provider: String,
    pub provider_model: String,
    #[serde(default)]
    pub max_token: i64,
    #[serde(default)]
    pub prompt_price_usd: f64,
    #[serde(default)]
    pub completion_price_usd: f64,
    /// Flat price per token; overrides per-token prices when positive.
    #[serde(default)]
    pub price_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_config: Option<serde_json::Value>,
    pub function: ModelFunction,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing)]
    pub deleted_at: Option<String>,
}

impl Model {
    /// Unique registry key: `provider:provider_model`.
    pub fn name(&self) -> String {
        format!("{}:{}", self.provider, self.provider_model)
    }

    /// Token cost in USD.
    ///
    /// Tie-break order, first match wins: positive flat price, then both
    /// per-token prices positive, then zero. Pure and deterministic.
    pub fn calculate_token_cost(&self, prompt_tokens: i64, completion_tokens: i64) -> f64 {
        let pc = prompt_tokens as f64;
        let cc = completion_tokens as f64;

        if self.price_usd > 0.0 {
            return self.price_usd * (pc + cc);
        }
        if self.prompt_price_usd > 0.0 && self.completion_price_usd > 0.0 {
            return self.prompt_price_usd * pc + self.completion_price_usd * cc;
        }
        0.0
    }

    /// Chat-capable OpenAI models, by fixed allow-list.
    pub fn is_openai_chat_model(&self) -> bool {
        self.provider == MODEL_PROVIDER_OPENAI
            && matches!(
                self.provider_model.as_str(),
                "gpt-4" | "gpt-4-32k" | "gpt-3.5-turbo"
            )
    }

    /// Completion-capable OpenAI models, by fixed allow-list.
    pub fn is_openai_completion_model(&self) -> bool {
        self.provider == MODEL_PROVIDER_OPENAI && self.provider_model == "text-davinci-003"
    }

    /// Decodes the opaque `custom_config` document.
    pub fn decode_custom_config(&self) -> Result<CustomConfig, ParlanceError> {
        let value = self
            .custom_config
            .clone()
            .ok_or_else(|| ParlanceError::Provider {
                message: format!("model {} has no custom_config", self.name()),
                source: None,
            })?;
        serde_json::from_value(value).map_err(|e| ParlanceError::Provider {
            message: format!("invalid custom_config for {}: {e}", self.name()),
            source: Some(Box::new(e)),
        })
    }
}

/// A chat completion request handed to a [`crate::ChatProvider`].
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Original user input.
    pub input: String,
    /// Augmented context blocks produced by the middleware pipeline.
    pub context: Vec<String>,
    /// Upper bound on completion tokens, from the model's `max_token`.
    pub max_tokens: i64,
}

/// A provider response, with the token counts used for cost accounting.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
}
