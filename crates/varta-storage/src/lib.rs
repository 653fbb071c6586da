// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Varta chat core.
//!
//! Provides WAL-mode SQLite storage with a single-writer concurrency model
//! via `tokio-rusqlite`, implementing the whole-record key-value contract:
//! the session list and the usage-statistics record are each read once at
//! startup and rewritten in full on every mutation.

pub mod adapter;
pub mod database;
pub mod records;

pub use adapter::SqliteStateStore;
pub use database::Database;
