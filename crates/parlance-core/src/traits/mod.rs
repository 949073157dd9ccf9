// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Parlance collaborator boundaries.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod provider;
pub mod store;

pub use provider::ChatProvider;
pub use store::{ConversationStore, ModelStore, TurnStore};
