// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for conversations, turns, and models.
//!
//! All access goes through a single [`Database`] handle whose writes are
//! serialized on tokio-rusqlite's background thread; the turn admission
//! check relies on that single-writer property. [`SqliteStore`] implements
//! the store traits from `parlance-core` by delegating to the typed query
//! modules.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteStore;
