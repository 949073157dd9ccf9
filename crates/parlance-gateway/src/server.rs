// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use parlance_core::{ConversationStore, ParlanceError, TurnStore};
use parlance_engine::TurnProcessor;
use parlance_models::ModelRegistry;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Turn admission, processing, and blocking reads.
    pub processor: TurnProcessor,
    /// Conversation CRUD.
    pub conversations: Arc<dyn ConversationStore>,
    /// Turn reads for the ownership check.
    pub turns: Arc<dyn TurnStore>,
    /// Model catalog.
    pub models: ModelRegistry,
    /// How long a turn read blocks before returning the current state.
    pub wait_timeout: Duration,
}

/// Build the gateway router over the given state.
///
/// Exposed separately from [`start_server`] so tests can drive the
/// router with `tower::ServiceExt::oneshot`.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/v1/conversations", post(handlers::create_conversation))
        .route(
            "/v1/conversations/{id}",
            get(handlers::get_conversation)
                .post(handlers::create_turn)
                .delete(handlers::delete_conversation),
        )
        .route(
            "/v1/conversations/{id}/turns/{turn_id}",
            get(handlers::get_turn),
        )
        .route(
            "/v1/models",
            post(handlers::create_model).get(handlers::list_models),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Binds to `host:port` and serves until the process stops.
pub async fn start_server(
    host: &str,
    port: u16,
    state: GatewayState,
) -> Result<(), ParlanceError> {
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParlanceError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| ParlanceError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
