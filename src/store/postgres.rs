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

//! PostgreSQL session store
//!
//! Certificate verification is only relaxed when `accept_invalid_certs` is set;
//! the URL's own `sslmode` is honoured otherwise, and `verify-full` is used when
//! the URL does not name one.

use super::{IdentityStore, redact_url};
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::jid::{SessionIdentity, escape_like};
use crate::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// whatsmeow store hosted on PostgreSQL
pub struct PostgresStore {
    pool: PgPool,
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
                 WHERE their_jid = $1 AND push_name IS NOT NULL AND push_name <> ''
                 ORDER BY push_name LIMIT 1"
            ),
            lid_by_name: format!(
                "SELECT their_jid FROM {contact_table}
                 WHERE push_name = $1 AND their_jid LIKE $2 ESCAPE '\\'
                 ORDER BY their_jid LIMIT 1"
            ),
            lid_by_pattern: format!(
                "SELECT their_jid FROM {contact_table}
                 WHERE their_jid LIKE $1 ESCAPE '\\'
                 ORDER BY their_jid LIMIT 1"
            ),
        }
    }
}

/// TLS mode to force for `url`, or `None` to keep what the URL asks for
pub(crate) fn forced_ssl_mode(url: &str, accept_invalid_certs: bool) -> Option<PgSslMode> {
    if accept_invalid_certs {
        Some(PgSslMode::Require)
    } else if url.contains("sslmode=") {
        None
    } else {
        Some(PgSslMode::VerifyFull)
    }
}

/// Hint for a failed connect when TLS verification was chosen implicitly
pub(crate) fn tls_hint(forced: Option<&PgSslMode>) -> Option<&'static str> {
    matches!(forced, Some(PgSslMode::VerifyFull)).then_some(
        "no sslmode in the URL, so TLS with full certificate verification was required; \
         append ?sslmode=disable for a local server without TLS",
    )
}

impl PostgresStore {
    /// Connect a single-connection pool. Fails fast; there is no retry.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string().into()))?;

        let forced = forced_ssl_mode(&config.url, config.accept_invalid_certs);
        let hint = tls_hint(forced.as_ref());

        match forced {
            Some(PgSslMode::Require) => {
                warn!("⚠️ TLS certificate verification disabled for the session store");
                options = options.ssl_mode(PgSslMode::Require);
            }
            Some(mode) => options = options.ssl_mode(mode),
            None => {}
        }

        info!("Connecting to PostgreSQL at: {}", redact_url(&config.url));

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect_with(options)
            .await
            .map_err(|e| match hint {
                Some(hint) => {
                    warn!("💡 {}", hint);
                    StoreError::ConnectionFailed(format!("{} ({})", e, hint).into())
                }
                None => StoreError::ConnectionFailed(e.to_string().into()),
            })?;

        Ok(Self {
            pool,
            sql: Statements::new(&config.session_table, &config.contact_table),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.pool.is_closed() {
            return Err(StoreError::Closed.into());
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for PostgresStore {
    async fn list_sessions(&self) -> Result<Vec<SessionIdentity>> {
        self.ensure_open()?;
        debug!("{}", self.sql.list_sessions);

        let jids: Vec<String> = sqlx::query_scalar(&self.sql.list_sessions)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::query("list_sessions", e))?;

        Ok(jids.into_iter().map(SessionIdentity::from).collect())
    }

    async fn push_name_for(&self, jid: &str) -> Result<Option<String>> {
        self.ensure_open()?;

        let name: Option<String> = sqlx::query_scalar(&self.sql.push_name)
            .bind(jid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::query("push_name_for", e))?;
        Ok(name)
    }

    async fn linked_id_by_name(&self, name: &str, suffix: &str) -> Result<Option<String>> {
        self.ensure_open()?;

        let lid: Option<String> = sqlx::query_scalar(&self.sql.lid_by_name)
            .bind(name)
            .bind(format!("%{}", escape_like(suffix)))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::query("linked_id_by_name", e))?;
        Ok(lid)
    }

    async fn linked_id_by_pattern(&self, pattern: &str) -> Result<Option<String>> {
        self.ensure_open()?;

        let lid: Option<String> = sqlx::query_scalar(&self.sql.lid_by_pattern)
            .bind(pattern)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::query("linked_id_by_pattern", e))?;
        Ok(lid)
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            debug!("PostgreSQL pool closed");
        }
    }
}
