// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parlance turn engine.

use thiserror::Error;

/// The primary error type used across all Parlance crates.
///
/// Submission-time errors (Validation, Conflict, NotFound) are returned
/// synchronously to the caller. Processing-time errors (Middleware,
/// Provider) are absorbed into the turn's terminal Error state and reach
/// waiters through the normal completion path.
#[derive(Debug, Error)]
pub enum ParlanceError {
    /// Malformed submission or invalid option value. Client-error class,
    /// never retried automatically.
    #[error("validation error: {0}")]
    Validation(String),

    /// A middleware name not present in the closed registry.
    #[error("unknown middleware: {0}")]
    UnknownMiddleware(String),

    /// Admission-control violation: the conversation already has a
    /// non-terminal turn outstanding. Callers may retry later.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unknown conversation, turn, or model.
    #[error("{resource} not found: {key}")]
    NotFound {
        resource: &'static str,
        key: String,
    },

    /// Middleware failure during asynchronous turn processing.
    #[error("middleware {name} failed: {message}")]
    Middleware { name: String, message: String },

    /// LLM provider failure (API error, bad custom config, transport).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A blocking wait was cancelled by its caller. Not a turn failure and
    /// must never alter turn state.
    #[error("wait cancelled")]
    Cancelled,

    /// Storage backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
