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

//! JID helpers
//!
//! A session JID looks like `<number>[:<device>]@<domain>`, e.g.
//! `923011234567:5@s.whatsapp.net`. Linked identifiers use the same layout with
//! a reserved domain (`@lid`). None of these helpers validate their input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default suffix marking a linked identifier
pub const LID_SUFFIX: &str = "@lid";

/// Number part of a JID: text before the first `@`, then before the first `:`
pub fn pure_number(jid: &str) -> &str {
    let user = jid.split('@').next().unwrap_or_default();
    user.split(':').next().unwrap_or_default()
}

/// [`pure_number`] with surrounding whitespace removed
pub fn clean_number(jid: &str) -> &str {
    pure_number(jid.trim()).trim()
}

/// Whether `jid` has the linked-identifier shape
pub fn is_linked_id(jid: &str, suffix: &str) -> bool {
    !suffix.is_empty() && jid.ends_with(suffix)
}

/// First `len` characters of `number`, or all of it when shorter
pub fn prefix_of(number: &str, len: usize) -> &str {
    match number.char_indices().nth(len) {
        Some((idx, _)) => &number[..idx],
        None => number,
    }
}

/// Escape `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A locally registered session, as stored in the device table
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionIdentity {
    jid: String,
}

impl SessionIdentity {
    pub fn new<S: Into<String>>(jid: S) -> Self {
        Self { jid: jid.into() }
    }

    /// Full JID as stored
    pub fn jid(&self) -> &str {
        &self.jid
    }

    pub fn pure_number(&self) -> &str {
        pure_number(&self.jid)
    }
}

impl From<&str> for SessionIdentity {
    fn from(s: &str) -> Self {
        SessionIdentity::new(s)
    }
}

impl From<String> for SessionIdentity {
    fn from(s: String) -> Self {
        SessionIdentity::new(s)
    }
}

impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionIdentity({})", self.jid)
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.jid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_number_strips_device_and_domain() {
        assert_eq!(pure_number("923011234567:5@s.whatsapp.net"), "923011234567");
        assert_eq!(pure_number("923011234567@s.whatsapp.net"), "923011234567");
        assert_eq!(pure_number("111222333444@lid"), "111222333444");
    }

    #[test]
    fn test_pure_number_malformed_input() {
        assert_eq!(pure_number(""), "");
        assert_eq!(pure_number("@s.whatsapp.net"), "");
        assert_eq!(pure_number(":3@s.whatsapp.net"), "");
        assert_eq!(pure_number("no-domain"), "no-domain");
        // `@` is split first, so a colon after it is irrelevant
        assert_eq!(pure_number("12345@host:99"), "12345");
    }

    #[test]
    fn test_clean_number_trims() {
        assert_eq!(clean_number("  923011234567:2@s.whatsapp.net "), "923011234567");
        assert_eq!(clean_number(" 923011234567 "), "923011234567");
    }

    #[test]
    fn test_is_linked_id() {
        assert!(is_linked_id("111222333444@lid", LID_SUFFIX));
        assert!(!is_linked_id("923011234567@s.whatsapp.net", LID_SUFFIX));
        assert!(!is_linked_id("111222333444@lid", ""));
    }

    #[test]
    fn test_prefix_of() {
        assert_eq!(prefix_of("923011234567", 8), "92301123");
        assert_eq!(prefix_of("9230", 8), "9230");
        assert_eq!(prefix_of("", 8), "");
        assert_eq!(prefix_of("٩٢٣٠١١٢٣٤٥", 3), "٩٢٣");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("92301123"), "92301123");
        assert_eq!(escape_like("a%b_c\\"), "a\\%b\\_c\\\\");
    }

    #[test]
    fn test_session_identity_accessors() {
        let session = SessionIdentity::from("923011111111:1@s.whatsapp.net");
        assert_eq!(session.jid(), "923011111111:1@s.whatsapp.net");
        assert_eq!(session.pure_number(), "923011111111");
        assert_eq!(session.to_string(), "923011111111:1@s.whatsapp.net");
    }
}
