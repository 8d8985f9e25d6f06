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

//! Identity resolution
//!
//! For every session the resolver tries, in order:
//!
//! 1. **Name match**: the push name recorded for the session's JID, then a
//!    linked-identifier contact with the same push name.
//! 2. **Prefix match**: a linked-identifier contact whose JID starts with the
//!    first `prefix_len` characters of the session's pure number.
//!
//! Sessions are processed one at a time. A store error aborts the whole pass.

use crate::config::ResolverConfig;
use crate::jid::{SessionIdentity, escape_like, is_linked_id, prefix_of};
use crate::output::{LidDocument, ResolutionMethod, ResolvedMapping};
use crate::store::IdentityStore;
use crate::Result;
use tracing::{debug, info, warn};

/// Summary of one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Sessions read from the device table
    pub sessions: usize,
    /// Pure numbers that could not be resolved, in session order
    pub unresolved: Vec<String>,
    pub document: LidDocument,
}

impl ResolutionReport {
    pub fn resolved(&self) -> usize {
        self.document.bots.len()
    }
}

/// Matches session identities to linked identifiers through an [`IdentityStore`]
pub struct Resolver<'a> {
    store: &'a dyn IdentityStore,
    config: ResolverConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn IdentityStore, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// `LIKE` pattern used by the prefix fallback
    pub fn prefix_pattern(&self, pure_number: &str) -> String {
        format!(
            "{}%{}",
            escape_like(prefix_of(pure_number, self.config.prefix_len)),
            escape_like(&self.config.lid_suffix)
        )
    }

    /// Resolve a single session, or `None` when neither heuristic matches
    pub async fn resolve_session(
        &self,
        session: &SessionIdentity,
    ) -> Result<Option<ResolvedMapping>> {
        let pure = session.pure_number();
        info!("🔍 Checking bot: {}", pure);

        if let Some(lid) = self.match_by_name(session).await? {
            info!("✅ LID matched by name: {}", lid);
            return Ok(Some(ResolvedMapping {
                phone: pure.to_string(),
                lid,
                method: ResolutionMethod::NameMatch,
            }));
        }

        if pure.is_empty() {
            warn!(
                "⚠️ Session {} has no number part, skipping prefix search",
                session.jid()
            );
            return Ok(None);
        }

        info!("⏳ No LID by name, falling back to number prefix");
        let pattern = self.prefix_pattern(pure);
        debug!("Prefix pattern: {}", pattern);

        let candidate = self.store.linked_id_by_pattern(&pattern).await?;
        match candidate.filter(|lid| self.is_lid(lid)) {
            Some(lid) => {
                info!("✅ LID matched by number prefix: {}", lid);
                Ok(Some(ResolvedMapping {
                    phone: pure.to_string(),
                    lid,
                    method: ResolutionMethod::PrefixMatch,
                }))
            }
            None => {
                info!("❌ No LID recorded yet for {}", pure);
                Ok(None)
            }
        }
    }

    async fn match_by_name(&self, session: &SessionIdentity) -> Result<Option<String>> {
        let Some(name) = self.store.push_name_for(session.jid()).await? else {
            debug!("No push name for {}", session.jid());
            return Ok(None);
        };

        info!("👤 Profile name: {:?}", name);
        let candidate = self
            .store
            .linked_id_by_name(&name, &self.config.lid_suffix)
            .await?;
        Ok(candidate.filter(|lid| self.is_lid(lid)))
    }

    // Backends differ in LIKE case folding; the suffix rule is case-sensitive
    fn is_lid(&self, candidate: &str) -> bool {
        let ok = is_linked_id(candidate, &self.config.lid_suffix);
        if !ok {
            warn!("⚠️ Ignoring {} (not a {} identifier)", candidate, self.config.lid_suffix);
        }
        ok
    }

    /// Resolve every session in the store
    pub async fn resolve_all(&self) -> Result<ResolutionReport> {
        let sessions = self.store.list_sessions().await?;
        if sessions.is_empty() {
            info!("No bot sessions registered, nothing to resolve");
        }

        let mut report = ResolutionReport {
            sessions: sessions.len(),
            ..ResolutionReport::default()
        };

        for session in &sessions {
            match self.resolve_session(session).await? {
                Some(mapping) => {
                    if let Some(previous) =
                        report.document.bots.insert(mapping.phone.clone(), mapping)
                    {
                        debug!("Replaced earlier mapping for {}", previous.phone);
                    }
                }
                None => report.unresolved.push(session.pure_number().to_string()),
            }
        }

        // Another device of the same number may have resolved
        let bots = &report.document.bots;
        let mut seen = Vec::new();
        report.unresolved.retain(|number| {
            if bots.get(number).is_some() || seen.contains(number) {
                return false;
            }
            seen.push(number.clone());
            true
        });

        Ok(report)
    }
}
