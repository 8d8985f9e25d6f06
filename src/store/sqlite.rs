// Copyright 2024 Saorsa Labs Limited
//
// This software is dual-licensed under:
// - GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later)
// - Commercial License
//
// For AGPL-3.0 license, see LICENSE-AGPL-3.0
// For commercial licensing, contact: saorsalabs@gmail.com
//
// Unless required by applicable law or agreed to in writing, software
// distributed under these licenses is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.

// SQLite session store using deadpool-sqlite + rusqlite

use super::IdentityStore;
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::jid::{SessionIdentity, escape_like};
use crate::Result;
use async_trait::async_trait;
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::{OptionalExtension, params};
use std::path::PathBuf;
use tracing::{debug, info};

/// whatsmeow store backed by a local SQLite file
pub struct SqliteStore {
    pool: Pool,
    sql: Statements,
}

struct Statements {
    list_sessions: String,
    push_name: String,
    lid_by_name: String,
    lid_by_pattern: String,
}

impl Statements {
    fn new(session_table: &str, contact_table: &str) -> Self {
        Self {
            list_sessions: format!("SELECT jid FROM {session_table} ORDER BY jid"),
            push_name: format!(
                "SELECT push_name FROM {contact_table}
                 WHERE their_jid = ?1 AND push_name IS NOT NULL AND push_name <> ''
                 ORDER BY push_name LIMIT 1"
            ),
            lid_by_name: format!(
                "SELECT their_jid FROM {contact_table}
                 WHERE push_name = ?1 AND their_jid LIKE ?2 ESCAPE '\\'
                 ORDER BY their_jid LIMIT 1"
            ),
            lid_by_pattern: format!(
                "SELECT their_jid FROM {contact_table}
                 WHERE their_jid LIKE ?1 ESCAPE '\\'
                 ORDER BY their_jid LIMIT 1"
            ),
        }
    }
}

impl SqliteStore {
    /// Open an existing SQLite store. A missing file is a connection failure,
    /// never an empty database.
    pub async fn open(path: impl Into<PathBuf>, config: &DatabaseConfig) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(StoreError::ConnectionFailed(
                format!("SQLite store not found at {}", path.display()).into(),
            )
            .into());
        }

        info!("Opening SQLite store at: {:?}", path);

        let cfg = Config::new(path);
        let pool = cfg
            .create_pool(Runtime::Tokio1)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string().into()))?;

        let store = Self {
            pool,
            sql: Statements::new(&config.session_table, &config.contact_table),
        };

        // Surface unreadable files at connect time rather than on the first query
        store
            .interact("connect", |conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            })
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string().into()))?;

        Ok(store)
    }

    async fn interact<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.pool.is_closed() {
            return Err(StoreError::Closed.into());
        }
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string().into()))?;

        // LIKE folds ASCII case by default; `@LID` is not a linked identifier
        let f = move |conn: &mut rusqlite::Connection| {
            conn.pragma_update(None, "case_sensitive_like", true)?;
            f(conn)
        };

        match conn.interact(f).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::query(operation, e).into()),
            Err(e) => Err(StoreError::query(
                operation,
                format!("Database interaction failed: {}", e),
            )
            .into()),
        }
    }
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn list_sessions(&self) -> Result<Vec<SessionIdentity>> {
        let sql = self.sql.list_sessions.clone();
        debug!("{}", sql);

        let jids = self
            .interact("list_sessions", move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

                let mut jids = Vec::new();
                for row in rows {
                    jids.push(row?);
                }
                Ok(jids)
            })
            .await?;

        Ok(jids.into_iter().map(SessionIdentity::from).collect())
    }

    async fn push_name_for(&self, jid: &str) -> Result<Option<String>> {
        let sql = self.sql.push_name.clone();
        let jid = jid.to_string();

        self.interact("push_name_for", move |conn| {
            conn.query_row(&sql, params![jid], |row| row.get::<_, String>(0))
                .optional()
        })
        .await
    }

    async fn linked_id_by_name(&self, name: &str, suffix: &str) -> Result<Option<String>> {
        let sql = self.sql.lid_by_name.clone();
        let name = name.to_string();
        let pattern = format!("%{}", escape_like(suffix));

        self.interact("linked_id_by_name", move |conn| {
            conn.query_row(&sql, params![name, pattern], |row| row.get::<_, String>(0))
                .optional()
        })
        .await
    }

    async fn linked_id_by_pattern(&self, pattern: &str) -> Result<Option<String>> {
        let sql = self.sql.lid_by_pattern.clone();
        let pattern = pattern.to_string();

        self.interact("linked_id_by_pattern", move |conn| {
            conn.query_row(&sql, params![pattern], |row| row.get::<_, String>(0))
                .optional()
        })
        .await
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close();
            debug!("SQLite pool closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LidError;
    use tempfile::TempDir;

    fn seed(path: &std::path::Path) {
        let conn = rusqlite::Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE whatsmeow_device (jid TEXT PRIMARY KEY);
             CREATE TABLE whatsmeow_contacts (
                 our_jid TEXT, their_jid TEXT, push_name TEXT,
                 PRIMARY KEY (our_jid, their_jid)
             );
             INSERT INTO whatsmeow_device VALUES ('923022222222:3@s.whatsapp.net');
             INSERT INTO whatsmeow_device VALUES ('923011111111:1@s.whatsapp.net');
             INSERT INTO whatsmeow_contacts VALUES ('a', '923011111111:1@s.whatsapp.net', '');
             INSERT INTO whatsmeow_contacts VALUES ('b', '923011111111:1@s.whatsapp.net', 'Bot A');
             INSERT INTO whatsmeow_contacts VALUES ('a', '999@lid', 'Bot A');
             INSERT INTO whatsmeow_contacts VALUES ('a', '111@lid', 'Bot A');
             INSERT INTO whatsmeow_contacts VALUES ('a', '92301111_x@s.whatsapp.net', NULL);",
        )
        .unwrap();
    }

    async fn open_seeded(dir: &TempDir) -> SqliteStore {
        let path = dir.path().join("store.db");
        seed(&path);
        SqliteStore::open(path, &DatabaseConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_is_connection_failure() {
        let dir = TempDir::new().unwrap();
        let result = SqliteStore::open(dir.path().join("absent.db"), &DatabaseConfig::default()).await;
        assert!(matches!(
            result,
            Err(LidError::Store(StoreError::ConnectionFailed(_)))
        ));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[tokio::test]
    async fn test_list_sessions_sorted() {
        let dir = TempDir::new().unwrap();
        let store = open_seeded(&dir).await;

        let sessions = store.list_sessions().await.unwrap();
        let jids: Vec<&str> = sessions.iter().map(|s| s.jid()).collect();
        assert_eq!(
            jids,
            vec!["923011111111:1@s.whatsapp.net", "923022222222:3@s.whatsapp.net"]
        );
    }

    #[tokio::test]
    async fn test_push_name_skips_empty_names() {
        let dir = TempDir::new().unwrap();
        let store = open_seeded(&dir).await;

        assert_eq!(
            store
                .push_name_for("923011111111:1@s.whatsapp.net")
                .await
                .unwrap()
                .as_deref(),
            Some("Bot A")
        );
        assert_eq!(
            store.push_name_for("923022222222:3@s.whatsapp.net").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_lid_lookups_pick_smallest_jid() {
        let dir = TempDir::new().unwrap();
        let store = open_seeded(&dir).await;

        assert_eq!(
            store.linked_id_by_name("Bot A", "@lid").await.unwrap().as_deref(),
            Some("111@lid")
        );
        assert_eq!(store.linked_id_by_name("Nobody", "@lid").await.unwrap(), None);
        assert_eq!(
            store.linked_id_by_pattern("9%@lid").await.unwrap().as_deref(),
            Some("999@lid")
        );
    }

    #[tokio::test]
    async fn test_like_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.db");
        seed(&path);
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "INSERT INTO whatsmeow_contacts VALUES ('a', '000@LID', 'Bot A');
             INSERT INTO whatsmeow_contacts VALUES ('a', '92301111777@LID', NULL);",
        )
        .unwrap();
        drop(conn);
        let store = SqliteStore::open(path, &DatabaseConfig::default()).await.unwrap();

        assert_eq!(
            store.linked_id_by_name("Bot A", "@lid").await.unwrap().as_deref(),
            Some("111@lid")
        );
        assert_eq!(store.linked_id_by_pattern("92301111%@lid").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_escaped_underscore_is_literal() {
        let dir = TempDir::new().unwrap();
        let store = open_seeded(&dir).await;

        // Unescaped `_` would match any character
        assert_eq!(
            store.linked_id_by_pattern("92301111\\_x%").await.unwrap().as_deref(),
            Some("92301111_x@s.whatsapp.net")
        );
        assert_eq!(store.linked_id_by_pattern("9230111\\_%").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let store = open_seeded(&dir).await;

        store.close().await;
        store.close().await;
        assert!(matches!(
            store.list_sessions().await,
            Err(LidError::Store(StoreError::Closed))
        ));
    }

    #[tokio::test]
    async fn test_missing_table_is_query_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE unrelated (x INTEGER);").unwrap();
        drop(conn);

        let store = SqliteStore::open(&path, &DatabaseConfig::default()).await.unwrap();
        assert!(matches!(
            store.list_sessions().await,
            Err(LidError::Store(StoreError::QueryFailed { .. }))
        ));
    }
}
