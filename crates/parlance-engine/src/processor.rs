// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The turn state machine: Pending -> Processing -> Completed | Error.
//!
//! `submit` performs validation and atomic admission, then hands the turn
//! to a spawned processing task and returns immediately. The task runs the
//! bot's middleware pipeline, invokes the model provider, writes the
//! terminal state, and broadcasts the persisted row to whoever is waiting.
//! Waiters never observe in-memory state: every wakeup ends in a re-read.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use parlance_core::{
    ChatProvider, ChatRequest, ConvTurn, ConversationStore, ParlanceError, TurnStatus, TurnStore,
};
use parlance_hub::NotificationHub;
use parlance_middleware::{MiddlewareContext, MiddlewarePipeline};
use parlance_models::ModelRegistry;

/// A configured bot, resolved and validated at startup.
///
/// The pipeline is built once from the bot's middleware descriptors; a
/// descriptor error is a startup failure, never a per-turn one.
pub struct BotRuntime {
    pub id: i64,
    pub name: String,
    /// Model name in `provider:provider_model` form.
    pub model: String,
    pub pipeline: MiddlewarePipeline,
}

impl std::fmt::Debug for BotRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRuntime")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Orchestrates the full lifecycle of conversation turns.
///
/// Cheap to clone; all state lives behind one `Arc`, which is what lets
/// `submit` hand a handle to the spawned processing task.
#[derive(Clone)]
pub struct TurnProcessor {
    inner: Arc<Inner>,
}

struct Inner {
    turns: Arc<dyn TurnStore>,
    conversations: Arc<dyn ConversationStore>,
    models: ModelRegistry,
    providers: HashMap<String, Arc<dyn ChatProvider>>,
    hub: Arc<NotificationHub<ConvTurn>>,
    bots: HashMap<i64, BotRuntime>,
    shutdown: CancellationToken,
}

impl TurnProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        turns: Arc<dyn TurnStore>,
        conversations: Arc<dyn ConversationStore>,
        models: ModelRegistry,
        providers: HashMap<String, Arc<dyn ChatProvider>>,
        hub: Arc<NotificationHub<ConvTurn>>,
        bots: Vec<BotRuntime>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                turns,
                conversations,
                models,
                providers,
                hub,
                bots: bots.into_iter().map(|bot| (bot.id, bot)).collect(),
                shutdown,
            }),
        }
    }

    pub fn bot(&self, id: i64) -> Option<&BotRuntime> {
        self.inner.bots.get(&id)
    }

    /// Admits a new turn into a conversation and schedules its processing.
    ///
    /// Returns the Pending turn on success. Fails with
    /// [`ParlanceError::Validation`] for empty input,
    /// [`ParlanceError::NotFound`] for an unknown conversation or bot, and
    /// [`ParlanceError::Conflict`] while the conversation's latest turn is
    /// still unprocessed.
    pub async fn submit(
        &self,
        conversation_id: &str,
        input: &str,
    ) -> Result<ConvTurn, ParlanceError> {
        if input.trim().is_empty() {
            return Err(ParlanceError::Validation(
                "turn request must not be empty".to_string(),
            ));
        }

        let conversation = self
            .inner
            .conversations
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| ParlanceError::NotFound {
                resource: "conversation",
                key: conversation_id.to_string(),
            })?;

        if !self.inner.bots.contains_key(&conversation.bot_id) {
            return Err(ParlanceError::NotFound {
                resource: "bot",
                key: conversation.bot_id.to_string(),
            });
        }

        // Admission check and insert are one atomic store operation.
        let turn = self.inner.turns.create_turn(conversation_id, input).await?;

        info!(
            turn_id = turn.id,
            conversation_id,
            bot_id = conversation.bot_id,
            "turn admitted"
        );

        let this = self.clone();
        let spawned = turn.clone();
        tokio::spawn(async move {
            this.process_turn(spawned).await;
        });

        Ok(turn)
    }

    /// Suspends until the turn is processed, `cancel` fires, or the result
    /// is already available.
    ///
    /// Always resolves to the *persisted* turn: if the wait was cancelled
    /// or the wakeup raced a concurrent write, the returned row is the
    /// current database state, terminal or not. Callers detect an elapsed
    /// wait by inspecting the returned status.
    pub async fn await_completion(
        &self,
        turn_id: i64,
        cancel: CancellationToken,
    ) -> Result<ConvTurn, ParlanceError> {
        let turn = self
            .inner
            .turns
            .get_turn(turn_id)
            .await?
            .ok_or_else(|| ParlanceError::NotFound {
                resource: "turn",
                key: turn_id.to_string(),
            })?;
        if turn.is_processed() {
            return Ok(turn);
        }

        match self.inner.hub.wait(&turn_id.to_string(), cancel).await {
            Ok(_) | Err(ParlanceError::Cancelled) => {}
            Err(err) => return Err(err),
        }

        // Re-read rather than trust the broadcast payload.
        self.inner
            .turns
            .get_turn(turn_id)
            .await?
            .ok_or_else(|| ParlanceError::NotFound {
                resource: "turn",
                key: turn_id.to_string(),
            })
    }

    async fn process_turn(&self, turn: ConvTurn) {
        let turn_id = turn.id;
        if let Err(err) = self
            .inner
            .turns
            .update_turn(turn_id, "", TurnStatus::Processing)
            .await
        {
            error!(turn_id, error = %err, "failed to mark turn processing");
        }

        let (response, status) = match self.run_turn(&turn).await {
            Ok(text) => (text, TurnStatus::Completed),
            Err(err) => {
                warn!(turn_id, error = %err, "turn processing failed");
                (err.to_string(), TurnStatus::Error)
            }
        };

        if let Err(err) = self.inner.turns.update_turn(turn_id, &response, status).await {
            error!(turn_id, error = %err, "failed to write terminal turn state");
            return;
        }

        // Broadcast the persisted row, not the in-memory value.
        match self.inner.turns.get_turn(turn_id).await {
            Ok(Some(persisted)) => {
                let woken = self.inner.hub.broadcast(&turn_id.to_string(), persisted);
                info!(turn_id, status = %status, woken, "turn processed");
            }
            Ok(None) => error!(turn_id, "terminal turn vanished before broadcast"),
            Err(err) => error!(turn_id, error = %err, "failed to re-read terminal turn"),
        }
    }

    async fn run_turn(&self, turn: &ConvTurn) -> Result<String, ParlanceError> {
        let bot = self
            .inner
            .bots
            .get(&turn.bot_id)
            .ok_or_else(|| ParlanceError::NotFound {
                resource: "bot",
                key: turn.bot_id.to_string(),
            })?;

        let ctx = MiddlewareContext {
            conversation_id: turn.conversation_id.clone(),
            user_identity: turn.user_identity.clone(),
            cancel: self.inner.shutdown.clone(),
        };
        let context = bot.pipeline.process_all(&ctx, &turn.request).await?;

        let model = self.inner.models.resolve_by_name(&bot.model).await?;
        let provider = self
            .inner
            .providers
            .get(&model.provider)
            .ok_or_else(|| ParlanceError::Provider {
                message: format!("no provider registered for {}", model.provider),
                source: None,
            })?;

        let request = ChatRequest {
            input: turn.request.clone(),
            context,
            max_tokens: model.max_token,
        };
        let response = provider
            .complete(&model, request, &self.inner.shutdown)
            .await?;

        let cost = model.calculate_token_cost(response.prompt_tokens, response.completion_tokens);
        info!(
            turn_id = turn.id,
            model = %model.name(),
            prompt_tokens = response.prompt_tokens,
            completion_tokens = response.completion_tokens,
            cost_usd = cost,
            "model invocation accounted"
        );

        Ok(response.text)
    }
}
