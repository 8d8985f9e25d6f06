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

//! Session store access
//!
//! The bot keeps its sessions in a whatsmeow store, either PostgreSQL or
//! SQLite. Only two tables are read:
//!
//! - the device table (`jid`): one row per locally registered session
//! - the contact table (`their_jid`, `push_name`): contacts and display names
//!
//! Every lookup returns at most one row. When several rows qualify the
//! lexically smallest one wins, so repeated runs over the same data agree.

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::jid::SessionIdentity;
use crate::{LidError, Result};
use async_trait::async_trait;

pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Read-only view of a whatsmeow session store
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// All sessions in the device table, ordered by JID
    async fn list_sessions(&self) -> Result<Vec<SessionIdentity>>;

    /// Non-empty push name recorded for exactly `jid`
    async fn push_name_for(&self, jid: &str) -> Result<Option<String>>;

    /// A contact ending in `suffix` whose push name equals `name`
    async fn linked_id_by_name(&self, name: &str, suffix: &str) -> Result<Option<String>>;

    /// A contact whose JID matches `pattern` (`LIKE ... ESCAPE '\'`)
    async fn linked_id_by_pattern(&self, pattern: &str) -> Result<Option<String>>;

    /// Release the underlying connections. Safe to call more than once.
    async fn close(&self);
}

/// Backend selected from the URL scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    /// SQLite database at the given path
    Sqlite(String),
}

impl StoreKind {
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(StoreKind::Postgres);
        }
        if let Some(rest) = url.strip_prefix("sqlite:") {
            let path = rest.strip_prefix("//").unwrap_or(rest);
            if path.is_empty() {
                return Err(StoreError::UnsupportedUrl("sqlite URL without a path".into()).into());
            }
            return Ok(StoreKind::Sqlite(path.to_string()));
        }
        if url.ends_with(".db") || url.ends_with(".sqlite") || url.ends_with(".sqlite3") {
            return Ok(StoreKind::Sqlite(url.to_string()));
        }

        Err(LidError::Store(StoreError::UnsupportedUrl(
            redact_url(url).into(),
        )))
    }
}

/// Open the store described by `config`
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn IdentityStore>> {
    match StoreKind::from_url(&config.url)? {
        StoreKind::Postgres => Ok(Box::new(PostgresStore::connect(config).await?)),
        StoreKind::Sqlite(path) => Ok(Box::new(SqliteStore::open(path, config).await?)),
    }
}

/// URL with any password replaced, safe for logs
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.split_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
