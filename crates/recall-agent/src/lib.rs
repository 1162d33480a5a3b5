// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation layer for Recall.
//!
//! Inbound channel messages enter through [`MessageRouter`], which resolves
//! the owner, loads the session, and hands the turn to the [`Orchestrator`].
//! The orchestrator runs the bounded tool-calling loop over the memory tools
//! in [`tools`], each backed by the engines wired in [`MemoryServices`].

pub mod orchestrator;
pub mod prompt;
pub mod router;
pub mod services;
pub mod session;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use orchestrator::Orchestrator;
pub use router::MessageRouter;
pub use services::MemoryServices;
pub use session::SessionManager;
pub use tools::{Tool, ToolContext, ToolOutput, ToolRegistry};
