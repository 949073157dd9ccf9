// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Parlance turn engine.
//!
//! Exposes conversation, turn, and model operations over a small axum
//! surface. Turn reads block up to the configured wait timeout and then
//! return the turn in whatever state it is in; clients poll again for
//! unfinished turns.

pub mod handlers;
pub mod server;

pub use server::{build_router, start_server, GatewayState};
