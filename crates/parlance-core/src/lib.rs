// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parlance turn engine.
//!
//! This crate provides the error type, domain types, and collaborator
//! traits used throughout the Parlance workspace: conversation turns and
//! their status machine, model descriptions with cost accounting, and the
//! store/provider boundaries the engine is written against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParlanceError;
pub use traits::{ChatProvider, ConversationStore, ModelStore, TurnStore};
pub use types::{
    ChatRequest, ChatResponse, ConvTurn, Conversation, CustomConfig, Model, ModelFunction,
    TurnStatus, MODEL_PROVIDER_CUSTOM, MODEL_PROVIDER_OPENAI,
};
