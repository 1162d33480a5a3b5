// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Recall memory assistant.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single
//! connection serialized through `tokio-rusqlite`, and typed query modules
//! for memories, categories, tags, relationship edges, conversation
//! sessions, and channel links.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
