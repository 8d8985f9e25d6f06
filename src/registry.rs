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

//! Read side of the LID document: phone -> LID lookups and owner checks

use crate::jid::{clean_number, pure_number};
use crate::output::{self, LidDocument, ResolvedMapping};
use crate::Result;
use std::path::Path;
use tracing::info;

/// Lookup table built from a persisted [`LidDocument`]
#[derive(Debug, Clone, Default)]
pub struct LidRegistry {
    document: LidDocument,
}

impl LidRegistry {
    pub fn new(document: LidDocument) -> Self {
        Self { document }
    }

    /// Load the document at `path`. A missing file yields an empty registry,
    /// which is normal before the first extraction.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("⚠️ No LID data file found at {}", path.display());
            return Ok(Self::default());
        }

        let document = output::load(path)?;
        info!("✅ Loaded {} LID(s) from {}", document.bots.len(), path.display());
        Ok(Self { document })
    }

    pub fn len(&self) -> usize {
        self.document.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.bots.is_empty()
    }

    /// Entries in document order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ResolvedMapping)> {
        self.document.bots.iter()
    }

    /// LID recorded for a phone number or any JID of that number
    pub fn lid_for_phone(&self, phone: &str) -> Option<&str> {
        let number = clean_number(phone);
        if number.is_empty() {
            return None;
        }
        self.document.bots.get(number).map(|m| m.lid.as_str())
    }

    /// Whether `sender_jid` is the bot's own account, reached either through
    /// its phone number or through its linked identifier
    pub fn is_owner(&self, bot_jid: &str, sender_jid: &str) -> bool {
        let bot_phone = clean_number(bot_jid);
        let sender = clean_number(sender_jid);
        if bot_phone.is_empty() || sender.is_empty() {
            return false;
        }

        let Some(lid) = self.lid_for_phone(bot_phone) else {
            return false;
        };

        sender == bot_phone || sender == pure_number(lid)
    }
}
