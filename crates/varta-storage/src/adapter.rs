// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StateStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use varta_config::model::StorageConfig;
use varta_core::types::{AdapterKind, ChatSession, HealthStatus, UserStats};
use varta_core::{Adapter, StateStore, VartaError};

use crate::database::Database;
use crate::records::{self, SESSIONS_KEY, STATS_KEY};

/// SQLite-backed state store.
///
/// Wraps a [`Database`] handle and maps the whole-record key-value contract
/// onto a single `records` table. The database is lazily opened on the
/// first call to [`StateStore::initialize`].
pub struct SqliteStateStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStateStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until [`StateStore::initialize`]
    /// is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, VartaError> {
        self.db.get().ok_or_else(|| VartaError::Storage {
            source: "store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl Adapter for SqliteStateStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_kind(&self) -> AdapterKind {
        AdapterKind::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, VartaError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VartaError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn initialize(&self) -> Result<(), VartaError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| VartaError::Storage {
            source: "store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite state store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), VartaError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn load_sessions(&self) -> Result<Vec<ChatSession>, VartaError> {
        let Some(raw) = records::get_record(self.db()?, SESSIONS_KEY).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|e| VartaError::Storage {
            source: Box::new(e),
        })
    }

    async fn save_sessions(&self, sessions: &[ChatSession]) -> Result<(), VartaError> {
        let raw = serde_json::to_string(sessions).map_err(|e| VartaError::Storage {
            source: Box::new(e),
        })?;
        records::put_record(self.db()?, SESSIONS_KEY, &raw).await
    }

    async fn load_stats(&self) -> Result<Option<UserStats>, VartaError> {
        let Some(raw) = records::get_record(self.db()?, STATS_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| VartaError::Storage {
                source: Box::new(e),
            })
    }

    async fn save_stats(&self, stats: &UserStats) -> Result<(), VartaError> {
        let raw = serde_json::to_string(stats).map_err(|e| VartaError::Storage {
            source: Box::new(e),
        })?;
        records::put_record(self.db()?, STATS_KEY, &raw).await
    }
}
