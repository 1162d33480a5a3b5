// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Recall integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock reasoning provider with scripted tool-loop responses
//! - [`MockEmbedder`] - Deterministic bag-of-words embedder with pinnable vectors
//! - [`TestHarness`] - Full router stack over a temporary SQLite database

pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;
