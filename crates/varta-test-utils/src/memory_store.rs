// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory StateStore for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use varta_core::types::{AdapterKind, ChatSession, HealthStatus, UserStats};
use varta_core::{Adapter, StateStore, VartaError};

/// StateStore keeping both records in memory. Tracks write counts so tests
/// can assert the write-through-on-every-mutation contract.
#[derive(Default)]
pub struct MemoryStateStore {
    sessions: Mutex<Vec<ChatSession>>,
    stats: Mutex<Option<UserStats>>,
    /// Every full session record ever written, in write order.
    write_history: Mutex<Vec<Vec<ChatSession>>>,
    session_writes: AtomicUsize,
    stats_writes: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds the persisted stats record.
    pub async fn seed_stats(&self, stats: UserStats) {
        *self.stats.lock().await = Some(stats);
    }

    /// Pre-seeds the persisted session list.
    pub async fn seed_sessions(&self, sessions: Vec<ChatSession>) {
        *self.sessions.lock().await = sessions;
    }

    pub fn session_writes(&self) -> usize {
        self.session_writes.load(Ordering::SeqCst)
    }

    /// Every full session record written so far, in write order. Lets tests
    /// observe intermediate streaming states, not just the final one.
    pub async fn write_history(&self) -> Vec<Vec<ChatSession>> {
        self.write_history.lock().await.clone()
    }

    pub fn stats_writes(&self) -> usize {
        self.stats_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for MemoryStateStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_kind(&self) -> AdapterKind {
        AdapterKind::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, VartaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VartaError> {
        Ok(())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn initialize(&self) -> Result<(), VartaError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), VartaError> {
        Ok(())
    }

    async fn load_sessions(&self) -> Result<Vec<ChatSession>, VartaError> {
        Ok(self.sessions.lock().await.clone())
    }

    async fn save_sessions(&self, sessions: &[ChatSession]) -> Result<(), VartaError> {
        self.session_writes.fetch_add(1, Ordering::SeqCst);
        self.write_history.lock().await.push(sessions.to_vec());
        *self.sessions.lock().await = sessions.to_vec();
        Ok(())
    }

    async fn load_stats(&self) -> Result<Option<UserStats>, VartaError> {
        Ok(self.stats.lock().await.clone())
    }

    async fn save_stats(&self, stats: &UserStats) -> Result<(), VartaError> {
        self.stats_writes.fetch_add(1, Ordering::SeqCst);
        *self.stats.lock().await = Some(stats.clone());
        Ok(())
    }
}
