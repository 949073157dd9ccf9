// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Turn status travels as its integer wire code; timestamps are RFC 3339
//! strings straight from the store.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use parlance_core::{Conversation, Model, ModelFunction, ParlanceError};

use crate::server::GatewayState;

/// Request body for POST /v1/conversations.
#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    /// Bot the conversation talks to.
    pub bot_id: i64,
    /// Opaque end-user identity.
    pub user_identity: String,
    /// Owning application, zero when unused.
    #[serde(default)]
    pub app_id: i64,
    /// Preferred language tag.
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_lang() -> String {
    "en".to_string()
}

/// Request body for POST /v1/conversations/{id}.
#[derive(Debug, Deserialize)]
pub struct CreateTurnRequest {
    /// User input for the new turn.
    pub content: String,
}

/// Query parameters for GET /v1/models.
#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    /// Optional function filter: "chat" or "embedding".
    #[serde(default)]
    pub function: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps a domain error onto an HTTP response.
///
/// `Conflict` defaults to 409; the turn submission handler overrides it
/// with 429 because there the conflict is a busy conversation, not a
/// duplicate resource.
fn error_response(err: ParlanceError) -> Response {
    let status = match &err {
        ParlanceError::Validation(_) | ParlanceError::UnknownMiddleware(_) => {
            StatusCode::BAD_REQUEST
        }
        ParlanceError::Conflict(_) => StatusCode::CONFLICT,
        ParlanceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ParlanceError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: err.to_string() })).into_response()
}

/// GET /health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /v1/conversations
pub async fn create_conversation(
    State(state): State<GatewayState>,
    Json(body): Json<CreateConversationRequest>,
) -> Response {
    if body.user_identity.trim().is_empty() {
        return error_response(ParlanceError::Validation(
            "user_identity must not be empty".to_string(),
        ));
    }
    if state.processor.bot(body.bot_id).is_none() {
        return error_response(ParlanceError::NotFound {
            resource: "bot",
            key: body.bot_id.to_string(),
        });
    }

    let now = chrono::Utc::now().to_rfc3339();
    let conversation = Conversation {
        id: uuid::Uuid::new_v4().to_string(),
        bot_id: body.bot_id,
        app_id: body.app_id,
        user_identity: body.user_identity,
        lang: body.lang,
        last_turn_id: None,
        created_at: now.clone(),
        updated_at: now,
    };

    match state.conversations.create_conversation(&conversation).await {
        Ok(()) => {
            debug!(conversation_id = %conversation.id, bot_id = conversation.bot_id, "conversation created");
            (StatusCode::CREATED, Json(conversation)).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// GET /v1/conversations/{id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.conversations.get_conversation(&id).await {
        Ok(Some(conversation)) => Json(conversation).into_response(),
        Ok(None) => error_response(ParlanceError::NotFound {
            resource: "conversation",
            key: id,
        }),
        Err(err) => error_response(err),
    }
}

/// DELETE /v1/conversations/{id}
pub async fn delete_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.conversations.get_conversation(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(ParlanceError::NotFound {
                resource: "conversation",
                key: id,
            });
        }
        Err(err) => return error_response(err),
    }
    match state.conversations.delete_conversation(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/conversations/{id}
///
/// Submits a new turn. Returns the Pending turn immediately; 429 while
/// the conversation's latest turn is still unprocessed.
pub async fn create_turn(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<CreateTurnRequest>,
) -> Response {
    match state.processor.submit(&id, &body.content).await {
        Ok(turn) => (StatusCode::OK, Json(turn)).into_response(),
        Err(ParlanceError::Conflict(message)) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse { error: message }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /v1/conversations/{id}/turns/{turn_id}
///
/// Blocks up to the configured wait timeout for the turn to complete,
/// then returns the turn in its current state. A turn belonging to a
/// different conversation is 404.
pub async fn get_turn(
    State(state): State<GatewayState>,
    Path((id, turn_id)): Path<(String, i64)>,
) -> Response {
    let owned = match state.turns.get_turn(turn_id).await {
        Ok(Some(turn)) => turn.conversation_id == id,
        Ok(None) => false,
        Err(err) => return error_response(err),
    };
    if !owned {
        return error_response(ParlanceError::NotFound {
            resource: "turn",
            key: turn_id.to_string(),
        });
    }

    // The timer lives inside this handler; an elapsed wait cancels the
    // hub registration and the turn comes back in its current, possibly
    // non-terminal state, not as an error.
    let cancel = CancellationToken::new();
    let wait = state.processor.await_completion(turn_id, cancel.clone());
    tokio::pin!(wait);

    let result = tokio::select! {
        result = &mut wait => result,
        () = tokio::time::sleep(state.wait_timeout) => {
            cancel.cancel();
            wait.await
        }
    };

    match result {
        Ok(turn) => Json(turn).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/models
///
/// Registers a model; 409 when the name is already taken.
pub async fn create_model(
    State(state): State<GatewayState>,
    Json(model): Json<Model>,
) -> Response {
    match state.models.register(&model).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /v1/models?function=chat|embedding
pub async fn list_models(
    State(state): State<GatewayState>,
    Query(query): Query<ModelsQuery>,
) -> Response {
    let function = match query.function.as_deref() {
        None => None,
        Some(text) => match text.parse::<ModelFunction>() {
            Ok(function) => Some(function),
            Err(_) => {
                return error_response(ParlanceError::Validation(format!(
                    "unknown model function: {text}"
                )));
            }
        },
    };

    match state.models.resolve_by_function(function).await {
        Ok(models) => Json(models).into_response(),
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_request_defaults_app_id_and_lang() {
        let json = r#"{"bot_id": 1, "user_identity": "user-1"}"#;
        let req: CreateConversationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.bot_id, 1);
        assert_eq!(req.user_identity, "user-1");
        assert_eq!(req.app_id, 0);
        assert_eq!(req.lang, "en");
    }

    #[test]
    fn turn_request_requires_content() {
        assert!(serde_json::from_str::<CreateTurnRequest>(r#"{}"#).is_err());
        let req: CreateTurnRequest =
            serde_json::from_str(r#"{"content": "hello"}"#).unwrap();
        assert_eq!(req.content, "hello");
    }

    #[test]
    fn error_response_serializes() {
        let resp = ErrorResponse {
            error: "something went wrong".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("something went wrong"));
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
    }
}
