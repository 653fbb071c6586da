// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State store trait for the persisted key-value record contract.

use async_trait::async_trait;

use crate::error::VartaError;
use crate::traits::adapter::Adapter;
use crate::types::{ChatSession, UserStats};

/// Durable store for the session list and usage-statistics records.
///
/// Both records are read once at startup and rewritten in full on every
/// mutation -- there are no partial or delta writes.
#[async_trait]
pub trait StateStore: Adapter {
    /// Initializes the store (schema setup, connection open).
    async fn initialize(&self) -> Result<(), VartaError>;

    /// Closes the store, flushing pending writes.
    async fn close(&self) -> Result<(), VartaError>;

    /// Loads the persisted session list, newest first. Empty if never written.
    async fn load_sessions(&self) -> Result<Vec<ChatSession>, VartaError>;

    /// Rewrites the full session record.
    async fn save_sessions(&self, sessions: &[ChatSession]) -> Result<(), VartaError>;

    /// Loads the persisted usage statistics, if any record exists.
    async fn load_stats(&self) -> Result<Option<UserStats>, VartaError>;

    /// Rewrites the full statistics record.
    async fn save_stats(&self, stats: &UserStats) -> Result<(), VartaError>;
}
