// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider trait for LLM endpoint integrations.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ParlanceError;
use crate::types::{ChatRequest, ChatResponse, Model};

/// Adapter for chat model invocation.
///
/// One provider serves all models sharing a [`Model::provider`] key; the
/// resolved model is passed per call so a single adapter can drive many
/// endpoint configurations.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider key matched against [`Model::provider`].
    fn name(&self) -> &str;

    /// Sends a completion request and returns the full response.
    ///
    /// Implementations must honor `cancel` while suspended on network I/O
    /// and fail with [`ParlanceError::Cancelled`] when it fires.
    async fn complete(
        &self,
        model: &Model,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse, ParlanceError>;
}
