// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store traits.

use async_trait::async_trait;
use tracing::debug;

use parlance_core::{
    ConvTurn, Conversation, ConversationStore, Model, ModelFunction, ModelStore, ParlanceError,
    TurnStatus, TurnStore,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. One instance serves all three store traits.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Opens the database at `path`, running migrations.
    pub async fn open(path: &str) -> Result<Self, ParlanceError> {
        let db = Database::open(path).await?;
        debug!(path, "SQLite store opened");
        Ok(Self { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoints the WAL before shutdown.
    pub async fn close(&self) -> Result<(), ParlanceError> {
        self.db.close().await
    }
}

#[async_trait]
impl TurnStore for SqliteStore {
    async fn create_turn(
        &self,
        conversation_id: &str,
        request: &str,
    ) -> Result<ConvTurn, ParlanceError> {
        queries::turns::create_turn(&self.db, conversation_id, request).await
    }

    async fn get_turn(&self, id: i64) -> Result<Option<ConvTurn>, ParlanceError> {
        queries::turns::get_turn(&self.db, id).await
    }

    async fn get_turns(&self, ids: &[i64]) -> Result<Vec<ConvTurn>, ParlanceError> {
        queries::turns::get_turns(&self.db, ids).await
    }

    async fn update_turn(
        &self,
        id: i64,
        response: &str,
        status: TurnStatus,
    ) -> Result<(), ParlanceError> {
        queries::turns::update_turn(&self.db, id, response, status).await
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn create_conversation(&self, conv: &Conversation) -> Result<(), ParlanceError> {
        queries::conversations::create_conversation(&self.db, conv).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ParlanceError> {
        queries::conversations::get_conversation(&self.db, id).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), ParlanceError> {
        queries::conversations::delete_conversation(&self.db, id).await
    }
}

#[async_trait]
impl ModelStore for SqliteStore {
    async fn get_model(&self, name: &str) -> Result<Option<Model>, ParlanceError> {
        queries::models::get_model(&self.db, name).await
    }

    async fn get_models_by_function(
        &self,
        function: Option<ModelFunction>,
    ) -> Result<Vec<Model>, ParlanceError> {
        queries::models::get_models_by_function(&self.db, function).await
    }

    async fn create_model(&self, model: &Model) -> Result<Model, ParlanceError> {
        queries::models::create_model(&self.db, model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("store.db");
        let store = SqliteStore::open(db_path.to_str().unwrap()).await.unwrap();
        (store, dir)
    }

    fn make_conversation(id: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            bot_id: 1,
            app_id: 1,
            user_identity: "user-1".to_string(),
            lang: "en".to_string(),
            last_turn_id: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn full_turn_lifecycle_through_store() {
        let (store, _dir) = open_store().await;

        store
            .create_conversation(&make_conversation("conv-1"))
            .await
            .unwrap();

        let turn = store.create_turn("conv-1", "what is rust?").await.unwrap();
        assert_eq!(turn.status, TurnStatus::Pending);

        // The conversation is busy until the turn terminates.
        assert!(matches!(
            store.create_turn("conv-1", "another").await,
            Err(ParlanceError::Conflict(_))
        ));

        store
            .update_turn(turn.id, "", TurnStatus::Processing)
            .await
            .unwrap();
        store
            .update_turn(turn.id, "a systems language", TurnStatus::Completed)
            .await
            .unwrap();

        let done = store.get_turn(turn.id).await.unwrap().unwrap();
        assert_eq!(done.status, TurnStatus::Completed);
        assert_eq!(done.response, "a systems language");

        let conv = store.get_conversation("conv-1").await.unwrap().unwrap();
        assert_eq!(conv.last_turn_id, Some(turn.id));

        store.delete_conversation("conv-1").await.unwrap();
        assert!(store.get_conversation("conv-1").await.unwrap().is_none());
        assert!(store.get_turn(turn.id).await.unwrap().is_none());

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn store_serves_the_model_catalog() {
        let (store, _dir) = open_store().await;

        let model = Model {
            id: 0,
            provider: "openai".to_string(),
            provider_model: "gpt-4".to_string(),
            max_token: 8192,
            prompt_price_usd: 0.00003,
            completion_price_usd: 0.00006,
            price_usd: 0.0,
            custom_config: None,
            function: ModelFunction::Chat,
            created_at: String::new(),
            deleted_at: None,
        };
        let created = store.create_model(&model).await.unwrap();
        assert!(created.id > 0);

        let resolved = store.get_model("openai:gpt-4").await.unwrap().unwrap();
        assert_eq!(resolved.id, created.id);

        let chat = store
            .get_models_by_function(Some(ModelFunction::Chat))
            .await
            .unwrap();
        assert_eq!(chat.len(), 1);

        store.close().await.unwrap();
    }
}
