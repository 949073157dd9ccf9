// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt augmentation middleware for the Parlance turn engine.
//!
//! A middleware is a named unit with two operations: option validation,
//! invoked once when a bot's middleware configuration is loaded, and
//! processing, invoked per request with the original user input. Validated
//! options live in the closed [`MiddlewareConfig`] enum -- no untyped maps
//! survive past validation.

pub mod pipeline;
pub mod search;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use parlance_core::ParlanceError;

pub use pipeline::{FailurePolicy, MiddlewarePipeline};
pub use search::{SearchMiddleware, SearchOptions};

/// Options shared by every middleware configured on a bot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneralOptions {
    pub bot_id: i64,
    pub app_id: i64,
}

/// Per-request context threaded through middleware processing.
///
/// `cancel` is the processing task's cancellation signal; middlewares that
/// suspend on I/O must honor it.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    pub conversation_id: String,
    pub user_identity: String,
    pub cancel: CancellationToken,
}

/// Validated, strongly-typed options -- one variant per middleware kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MiddlewareConfig {
    Search(SearchOptions),
}

/// Raw middleware reference as configured on a bot: a registry name plus an
/// unvalidated option document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiddlewareDescriptor {
    pub name: String,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// A named prompt augmentation step.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Registry key.
    fn name(&self) -> &'static str;

    /// Validates a raw option document into this middleware's
    /// [`MiddlewareConfig`] variant.
    ///
    /// Strict: unknown keys are ignored, type mismatches and out-of-range
    /// values fail with [`ParlanceError::Validation`]. Called at pipeline
    /// build time, never per request.
    fn validate_options(
        &self,
        general: &GeneralOptions,
        raw: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<MiddlewareConfig, ParlanceError>;

    /// Produces an augmented context block from the original user input.
    ///
    /// An empty result contributes nothing to the prompt. Failures abort
    /// this middleware's contribution; the pipeline's failure policy
    /// decides what happens to the turn.
    async fn process(
        &self,
        ctx: &MiddlewareContext,
        config: &MiddlewareConfig,
        input: &str,
    ) -> Result<String, ParlanceError>;
}

impl std::fmt::Debug for dyn Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// Closed name-keyed registry of available middlewares, built once at
/// startup and passed by reference into pipeline construction.
#[derive(Default)]
pub struct MiddlewareRegistry {
    entries: HashMap<&'static str, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in middleware; `search_endpoint` overrides
    /// the search middleware's lookup URL.
    pub fn builtin(search_endpoint: &str) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchMiddleware::new(search_endpoint.to_string())));
        registry
    }

    pub fn register(&mut self, middleware: Arc<dyn Middleware>) {
        self.entries.insert(middleware.name(), middleware);
    }

    /// Looks up a middleware; an unknown name fails with
    /// [`ParlanceError::UnknownMiddleware`].
    pub fn get(&self, name: &str) -> Result<Arc<dyn Middleware>, ParlanceError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| ParlanceError::UnknownMiddleware(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_search() {
        let registry = MiddlewareRegistry::builtin("https://api.duckduckgo.com/");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("search").unwrap().name(), "search");
    }

    #[test]
    fn unknown_name_fails_lookup() {
        let registry = MiddlewareRegistry::builtin("https://api.duckduckgo.com/");
        let err = registry.get("no-such-middleware").unwrap_err();
        assert!(matches!(err, ParlanceError::UnknownMiddleware(name) if name == "no-such-middleware"));
    }

    #[test]
    fn descriptor_deserializes_with_default_options() {
        let descriptor: MiddlewareDescriptor =
            serde_json::from_str(r#"{"name": "search"}"#).unwrap();
        assert_eq!(descriptor.name, "search");
        assert!(descriptor.options.is_empty());
    }
}
