// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model registry for the Parlance turn engine.
//!
//! [`ModelRegistry`] is an explicit registry object constructed once at
//! startup and handed by clone (it is cheap, an `Arc` inside) to the
//! components that resolve models -- no ambient global state.

pub mod memory;

use std::sync::Arc;

use tracing::debug;

use parlance_core::{Model, ModelFunction, ModelStore, ParlanceError};

pub use memory::MemoryModelStore;

/// Resolves named or functional models against a [`ModelStore`].
#[derive(Clone)]
pub struct ModelRegistry {
    store: Arc<dyn ModelStore>,
}

impl ModelRegistry {
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self { store }
    }

    /// Resolves a model by its `provider:provider_model` name.
    pub async fn resolve_by_name(&self, name: &str) -> Result<Model, ParlanceError> {
        self.store
            .get_model(name)
            .await?
            .ok_or_else(|| ParlanceError::NotFound {
                resource: "model",
                key: name.to_string(),
            })
    }

    /// All non-deleted models matching `function`; all of them when `None`.
    pub async fn resolve_by_function(
        &self,
        function: Option<ModelFunction>,
    ) -> Result<Vec<Model>, ParlanceError> {
        self.store.get_models_by_function(function).await
    }

    /// Registers a model, assigning a unique id and `created_at`.
    ///
    /// Fails with [`ParlanceError::Conflict`] when the name is taken and
    /// [`ParlanceError::Validation`] on an empty provider or model name.
    pub async fn register(&self, model: &Model) -> Result<Model, ParlanceError> {
        if model.provider.trim().is_empty() || model.provider_model.trim().is_empty() {
            return Err(ParlanceError::Validation(
                "model provider and provider_model must not be empty".to_string(),
            ));
        }

        let created = self.store.create_model(model).await?;
        debug!(name = %created.name(), id = created.id, "model registered");
        Ok(created)
    }
}
