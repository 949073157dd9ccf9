// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Web search middleware backed by the DuckDuckGo Instant Answer API.
//!
//! Performs one bounded lookup per request and concatenates up to `limit`
//! result lines into a context block appended to the prompt. No internal
//! retry: a failed lookup fails the middleware invocation and the
//! pipeline's failure policy takes over.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use parlance_core::ParlanceError;

use crate::{GeneralOptions, Middleware, MiddlewareConfig, MiddlewareContext};

/// Default public Instant Answer endpoint.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.duckduckgo.com/";

const DEFAULT_LIMIT: u64 = 3;

/// Validated options for the search middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub general: GeneralOptions,
    /// Maximum number of result lines. Positive integer, default 3.
    pub limit: u64,
}

/// DuckDuckGo-backed search augmentation.
pub struct SearchMiddleware {
    client: reqwest::Client,
    endpoint: String,
}

impl SearchMiddleware {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    async fn web_search(&self, query: &str, limit: u64) -> Result<Vec<String>, ParlanceError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("no_redirect", "1"),
            ])
            .send()
            .await
            .map_err(|e| middleware_err(format!("search request failed: {e}")))?
            .error_for_status()
            .map_err(|e| middleware_err(format!("search request failed: {e}")))?;

        let answer: InstantAnswer = response
            .json()
            .await
            .map_err(|e| middleware_err(format!("search response is not valid JSON: {e}")))?;

        let mut results = Vec::new();
        if !answer.abstract_text.is_empty() {
            results.push(answer.abstract_text);
        }
        collect_topic_texts(&answer.related_topics, limit as usize, &mut results);
        results.truncate(limit as usize);
        Ok(results)
    }
}

impl Default for SearchMiddleware {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_ENDPOINT.to_string())
    }
}

#[async_trait]
impl Middleware for SearchMiddleware {
    fn name(&self) -> &'static str {
        "search"
    }

    fn validate_options(
        &self,
        general: &GeneralOptions,
        raw: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<MiddlewareConfig, ParlanceError> {
        let mut options = SearchOptions {
            general: general.clone(),
            limit: DEFAULT_LIMIT,
        };

        if let Some(value) = raw.get("limit") {
            let number = value.as_f64().ok_or_else(|| {
                ParlanceError::Validation(format!("limit is not a number: {value}"))
            })?;
            if number <= 0.0 || number.fract() != 0.0 {
                return Err(ParlanceError::Validation(format!(
                    "limit is not a positive integer: {number}"
                )));
            }
            options.limit = number as u64;
        }

        Ok(MiddlewareConfig::Search(options))
    }

    async fn process(
        &self,
        ctx: &MiddlewareContext,
        config: &MiddlewareConfig,
        input: &str,
    ) -> Result<String, ParlanceError> {
        let MiddlewareConfig::Search(options) = config;

        let results = tokio::select! {
            results = self.web_search(input, options.limit) => results?,
            () = ctx.cancel.cancelled() => return Err(ParlanceError::Cancelled),
        };

        debug!(
            conversation_id = %ctx.conversation_id,
            count = results.len(),
            "search middleware collected results"
        );

        if results.is_empty() {
            return Ok(String::new());
        }

        let mut block = String::from("Web search results:\n");
        for line in &results {
            block.push_str("- ");
            block.push_str(line);
            block.push('\n');
        }
        Ok(block)
    }
}

fn middleware_err(message: String) -> ParlanceError {
    ParlanceError::Middleware {
        name: "search".to_string(),
        message,
    }
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Related topics are either direct results or named groups of results.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Topic {
        #[serde(rename = "Text")]
        text: String,
    },
    Group {
        #[serde(rename = "Topics", default)]
        topics: Vec<RelatedTopic>,
    },
}

fn collect_topic_texts(topics: &[RelatedTopic], limit: usize, out: &mut Vec<String>) {
    for topic in topics {
        if out.len() >= limit {
            return;
        }
        match topic {
            RelatedTopic::Topic { text } => {
                if !text.is_empty() {
                    out.push(text.clone());
                }
            }
            RelatedTopic::Group { topics } => collect_topic_texts(topics, limit, out),
        }
    }
}
