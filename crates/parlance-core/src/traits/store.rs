// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store traits for the persistence boundary.

use async_trait::async_trait;

use crate::error::ParlanceError;
use crate::types::{ConvTurn, Conversation, Model, ModelFunction, TurnStatus};

/// Persistence for conversation turns.
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Inserts a Pending turn (request stored, response empty) for the
    /// conversation.
    ///
    /// The admission check -- the conversation's latest turn must be
    /// processed -- and the insert happen as one atomic unit, so two
    /// submissions racing on the same conversation cannot both succeed.
    /// A violation fails with [`ParlanceError::Conflict`]; an unknown
    /// conversation with [`ParlanceError::NotFound`].
    async fn create_turn(
        &self,
        conversation_id: &str,
        request: &str,
    ) -> Result<ConvTurn, ParlanceError>;

    async fn get_turn(&self, id: i64) -> Result<Option<ConvTurn>, ParlanceError>;

    /// Fetches the given turns, ordered by id.
    async fn get_turns(&self, ids: &[i64]) -> Result<Vec<ConvTurn>, ParlanceError>;

    /// Writes response text and status.
    ///
    /// The write is monotone: a status lower than or equal to the stored
    /// one is a no-op, which makes terminal writes idempotent and status
    /// regression impossible.
    async fn update_turn(
        &self,
        id: i64,
        response: &str,
        status: TurnStatus,
    ) -> Result<(), ParlanceError>;
}

/// Persistence for conversations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, conv: &Conversation) -> Result<(), ParlanceError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ParlanceError>;

    async fn delete_conversation(&self, id: &str) -> Result<(), ParlanceError>;
}

/// Persistence for model descriptions.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Looks up a non-deleted model by its `provider:provider_model` name.
    async fn get_model(&self, name: &str) -> Result<Option<Model>, ParlanceError>;

    /// All non-deleted models, optionally filtered by function.
    async fn get_models_by_function(
        &self,
        function: Option<ModelFunction>,
    ) -> Result<Vec<Model>, ParlanceError>;

    /// Inserts a model, assigning its id and `created_at`. Fails with
    /// [`ParlanceError::Conflict`] when the name is already registered.
    async fn create_model(&self, model: &Model) -> Result<Model, ParlanceError>;
}
