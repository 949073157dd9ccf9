// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat provider for user-defined HTTP endpoints.
//!
//! A model with `provider = "custom"` carries a `custom_config` document
//! describing the request to make (url, method, headers, body template) and
//! how to pull the completion text out of the response (a dot-separated
//! JSON path). `{{input}}` placeholders in body string values are replaced
//! with the assembled prompt, `{{max_tokens}}` with the model's completion
//! token limit. One request per call, no retry.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use parlance_core::{
    ChatProvider, ChatRequest, ChatResponse, CustomConfig, Model, ParlanceError,
    MODEL_PROVIDER_CUSTOM,
};

/// [`ChatProvider`] for `provider = "custom"` models.
pub struct CustomEndpointProvider {
    client: reqwest::Client,
}

impl CustomEndpointProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn invoke(
        &self,
        model: &Model,
        config: &CustomConfig,
        prompt: &str,
        max_tokens: i64,
    ) -> Result<String, ParlanceError> {
        let method = reqwest::Method::from_bytes(config.request.method.as_bytes())
            .map_err(|_| provider_err(format!(
                "invalid method {:?} in custom_config for {}",
                config.request.method,
                model.name()
            )))?;

        let mut body = serde_json::Map::new();
        for (key, value) in &config.request.data {
            body.insert(key.clone(), substitute_placeholders(value, prompt, max_tokens));
        }

        let mut request = self
            .client
            .request(method, &config.request.url)
            .json(&body);
        for (name, value) in &config.request.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| provider_source_err(format!("custom endpoint request failed: {e}"), e))?
            .error_for_status()
            .map_err(|e| provider_source_err(format!("custom endpoint request failed: {e}"), e))?;

        let document: serde_json::Value = response.json().await.map_err(|e| {
            provider_source_err(format!("custom endpoint returned invalid JSON: {e}"), e)
        })?;

        let text = extract_path(&document, &config.response.path).ok_or_else(|| {
            provider_err(format!(
                "path {:?} not present in custom endpoint response for {}",
                config.response.path,
                model.name()
            ))
        })?;

        debug!(model = %model.name(), "custom endpoint responded");
        Ok(text)
    }
}

impl Default for CustomEndpointProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for CustomEndpointProvider {
    fn name(&self) -> &str {
        MODEL_PROVIDER_CUSTOM
    }

    async fn complete(
        &self,
        model: &Model,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, ParlanceError> {
        let config = model.decode_custom_config()?;
        let prompt = assemble_prompt(&request);

        let text = tokio::select! {
            text = self.invoke(model, &config, &prompt, request.max_tokens) => text?,
            () = cancel.cancelled() => return Err(ParlanceError::Cancelled),
        };

        // Custom endpoints report no token usage; cost accounting sees zero
        // counts and flat pricing applies only to what the model declares.
        Ok(ChatResponse {
            text,
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }
}

/// Joins augmented context blocks and the user input into one prompt.
fn assemble_prompt(request: &ChatRequest) -> String {
    if request.context.is_empty() {
        return request.input.clone();
    }
    let mut prompt = String::new();
    for block in &request.context {
        prompt.push_str(block);
        prompt.push('\n');
    }
    prompt.push_str(&request.input);
    prompt
}

/// Replaces `{{input}}` and `{{max_tokens}}` in string values, recursing
/// through containers. A value that is exactly `"{{max_tokens}}"` becomes a
/// JSON number so numeric request fields can be templated.
fn substitute_placeholders(
    value: &serde_json::Value,
    prompt: &str,
    max_tokens: i64,
) -> serde_json::Value {
    match value {
        serde_json::Value::String(text) => {
            if text == "{{max_tokens}}" {
                return serde_json::Value::Number(max_tokens.into());
            }
            serde_json::Value::String(
                text.replace("{{input}}", prompt)
                    .replace("{{max_tokens}}", &max_tokens.to_string()),
            )
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| substitute_placeholders(item, prompt, max_tokens))
                .collect(),
        ),
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, item)| {
                    (key.clone(), substitute_placeholders(item, prompt, max_tokens))
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Walks a dot-separated path; numeric segments index into arrays. The
/// resolved value must be a string.
fn extract_path(document: &serde_json::Value, path: &str) -> Option<String> {
    let mut current = document;
    for segment in path.split('.') {
        current = match current {
            serde_json::Value::Object(map) => map.get(segment)?,
            serde_json::Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    current.as_str().map(str::to_string)
}

fn provider_err(message: String) -> ParlanceError {
    ParlanceError::Provider {
        message,
        source: None,
    }
}

fn provider_source_err(
    message: String,
    source: impl std::error::Error + Send + Sync + 'static,
) -> ParlanceError {
    ParlanceError::Provider {
        message,
        source: Some(Box::new(source)),
    }
}
