// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whole-record reads and writes.
//!
//! The persisted-state contract is key-value: each record is read once at
//! startup and rewritten in full on every mutation. No partial writes.

use rusqlite::params;
use varta_core::VartaError;

use crate::database::{map_tr_err, Database};

/// Record key for the ordered session list.
pub const SESSIONS_KEY: &str = "sessions";

/// Record key for the usage-statistics record.
pub const STATS_KEY: &str = "stats";

/// Read a record's JSON value, or `None` if it was never written.
pub async fn get_record(db: &Database, key: &str) -> Result<Option<String>, VartaError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT value FROM records WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Rewrite a record in full, stamping the update time.
pub async fn put_record(db: &Database, key: &str, value: &str) -> Result<(), VartaError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO records (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn get_missing_record_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_record(&db, SESSIONS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (db, _dir) = setup_db().await;
        put_record(&db, STATS_KEY, r#"{"a":1}"#).await.unwrap();
        let value = get_record(&db, STATS_KEY).await.unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn put_replaces_previous_value_in_full() {
        let (db, _dir) = setup_db().await;
        put_record(&db, SESSIONS_KEY, "[1]").await.unwrap();
        put_record(&db, SESSIONS_KEY, "[1,2]").await.unwrap();
        let value = get_record(&db, SESSIONS_KEY).await.unwrap();
        assert_eq!(value.as_deref(), Some("[1,2]"));
    }

    #[tokio::test]
    async fn records_are_isolated_by_key() {
        let (db, _dir) = setup_db().await;
        put_record(&db, SESSIONS_KEY, "[]").await.unwrap();
        put_record(&db, STATS_KEY, "{}").await.unwrap();
        assert_eq!(
            get_record(&db, SESSIONS_KEY).await.unwrap().as_deref(),
            Some("[]")
        );
        assert_eq!(
            get_record(&db, STATS_KEY).await.unwrap().as_deref(),
            Some("{}")
        );
    }
}
