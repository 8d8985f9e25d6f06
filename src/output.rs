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

//! LID document persistence
//!
//! The document has a single top-level key:
//!
//! ```json
//! {
//!   "bots": {
//!     "923011111111": {
//!       "phone": "923011111111",
//!       "lid": "111222333444@lid",
//!       "method": "name_match"
//!     }
//!   }
//! }
//! ```
//!
//! Bots keep the order in which they were first inserted.

use crate::error::OutputError;
use crate::Result;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Which heuristic produced a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// The bot's push name matched a linked-identifier contact
    NameMatch,
    /// A linked identifier started with the bot's number prefix
    PrefixMatch,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionMethod::NameMatch => write!(f, "name_match"),
            ResolutionMethod::PrefixMatch => write!(f, "prefix_match"),
        }
    }
}

/// One bot's phone number paired with its linked identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMapping {
    pub phone: String,
    pub lid: String,
    pub method: ResolutionMethod,
}

/// Insertion-ordered map of pure number to mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotMappings {
    entries: Vec<(String, ResolvedMapping)>,
}

impl BotMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, phone: String, mapping: ResolvedMapping) -> Option<ResolvedMapping> {
        match self.entries.iter_mut().find(|(key, _)| *key == phone) {
            Some((_, existing)) => Some(std::mem::replace(existing, mapping)),
            None => {
                self.entries.push((phone, mapping));
                None
            }
        }
    }

    pub fn get(&self, phone: &str) -> Option<&ResolvedMapping> {
        self.entries
            .iter()
            .find(|(key, _)| key == phone)
            .map(|(_, mapping)| mapping)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedMapping)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for BotMappings {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (phone, mapping) in &self.entries {
            map.serialize_entry(phone, mapping)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BotMappings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct BotMappingsVisitor;

        impl<'de> Visitor<'de> for BotMappingsVisitor {
            type Value = BotMappings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of phone numbers to LID mappings")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut bots = BotMappings::new();
                while let Some((phone, mapping)) =
                    access.next_entry::<String, ResolvedMapping>()?
                {
                    bots.insert(phone, mapping);
                }
                Ok(bots)
            }
        }

        deserializer.deserialize_map(BotMappingsVisitor)
    }
}

/// The persisted LID document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LidDocument {
    #[serde(default)]
    pub bots: BotMappings,
}

/// Outcome of [`persist`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    Written,
    /// Nothing resolved; any existing file was left untouched
    Skipped,
}

impl LidDocument {
    /// Pretty JSON with two-space indentation and no trailing newline
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Overwrite `path` with `doc` when it has at least one bot
pub fn persist(doc: &LidDocument, path: &Path) -> Result<Persisted> {
    if doc.bots.is_empty() {
        debug!("No mappings resolved, leaving {} untouched", path.display());
        return Ok(Persisted::Skipped);
    }

    let json = doc.to_json()?;
    fs::write(path, json).map_err(|e| OutputError::Io {
        path: path.to_string_lossy().to_string().into(),
        source: e,
    })?;

    info!("💾 LID data saved to: {}", path.display());
    Ok(Persisted::Written)
}

/// Read a document written by [`persist`]
pub fn load(path: &Path) -> Result<LidDocument> {
    let content = fs::read_to_string(path).map_err(|e| OutputError::Io {
        path: path.to_string_lossy().to_string().into(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| {
        OutputError::Malformed {
            path: path.to_string_lossy().to_string().into(),
            reason: e.to_string().into(),
        }
        .into()
    })
}
