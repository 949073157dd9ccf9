// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`ModelStore`] for tests and config-seeded deployments that
//! do not persist model catalogs.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use parlance_core::{Model, ModelFunction, ModelStore, ParlanceError};

/// A `ModelStore` backed by a mutex-guarded vector.
#[derive(Default)]
pub struct MemoryModelStore {
    models: Mutex<Vec<Model>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, assigning ids, skipping duplicates by name.
    pub fn with_models(models: Vec<Model>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.models.lock().expect("model store lock poisoned");
            for mut model in models {
                if guard.iter().any(|m| m.name() == model.name()) {
                    continue;
                }
                model.id = guard.len() as i64 + 1;
                if model.created_at.is_empty() {
                    model.created_at = Utc::now().to_rfc3339();
                }
                guard.push(model);
            }
        }
        store
    }
}

#[async_trait]
impl ModelStore for MemoryModelStore {
    async fn get_model(&self, name: &str) -> Result<Option<Model>, ParlanceError> {
        let models = self.models.lock().expect("model store lock poisoned");
        Ok(models
            .iter()
            .find(|m| m.deleted_at.is_none() && m.name() == name)
            .cloned())
    }

    async fn get_models_by_function(
        &self,
        function: Option<ModelFunction>,
    ) -> Result<Vec<Model>, ParlanceError> {
        let models = self.models.lock().expect("model store lock poisoned");
        Ok(models
            .iter()
            .filter(|m| m.deleted_at.is_none())
            .filter(|m| function.is_none_or(|f| m.function == f))
            .cloned()
            .collect())
    }

    async fn create_model(&self, model: &Model) -> Result<Model, ParlanceError> {
        let mut models = self.models.lock().expect("model store lock poisoned");
        if models
            .iter()
            .any(|m| m.deleted_at.is_none() && m.name() == model.name())
        {
            return Err(ParlanceError::Conflict(format!(
                "model {} already registered",
                model.name()
            )));
        }

        let mut created = model.clone();
        created.id = models.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        created.created_at = Utc::now().to_rfc3339();
        created.deleted_at = None;
        models.push(created.clone());
        Ok(created)
    }
}
