// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn processing engine.
//!
//! [`TurnProcessor`] is the single entry point for conversation turns:
//! synchronous admission through [`TurnProcessor::submit`], asynchronous
//! processing on a spawned task, and blocking reads through
//! [`TurnProcessor::await_completion`]. The persisted turn row is the only
//! authoritative state; the notification hub is purely a wakeup channel.

pub mod processor;

pub use processor::{BotRuntime, TurnProcessor};
