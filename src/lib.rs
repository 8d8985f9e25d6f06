// Copyright 2024 Saorsa Labs Limited
//
// This software is dual-licensed under:
// - GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later)
// - Commercial License
//
// For AGPL-3.0 license, see LICENSE-AGPL-3.0
// For commercial licensing, contact: david@saorsalabs.com
//
// Unless required by applicable law or agreed to in writing, software
// distributed under these licenses is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.

// Enforce no unwrap/expect/panic in production code only (tests can use them)
#![cfg_attr(not(test), warn(clippy::unwrap_used))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(test), warn(clippy::panic))]

//! # LID Extractor
//!
//! Finds a WhatsApp bot's own linked identifier (LID) by reading the
//! whatsmeow session store it runs on.
//!
//! ## Features
//!
//! - PostgreSQL and SQLite session stores
//! - Name-based matching with a number-prefix fallback
//! - Insertion-ordered JSON output, written only when something resolved
//! - Registry for phone -> LID lookups and owner checks
//!
//! ## Example
//!
//! ```rust,ignore
//! use lid_extractor::{Config, run_extraction};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!     let outcome = run_extraction(&config).await?;
//!     println!("resolved {}", outcome.report.resolved());
//!     Ok(())
//! }
//! ```

#![warn(rust_2018_idioms)]

/// Configuration management
pub mod config;

/// Error types
pub mod error;

/// JID parsing helpers
pub mod jid;

/// Session store backends
pub mod store;

/// Matching sessions to linked identifiers
pub mod resolver;

/// LID document persistence
pub mod output;

/// Consumer-side lookups over the LID document
pub mod registry;

/// Top-level extraction run
pub mod extract;

pub use config::Config;
pub use error::{LidError, Result};
pub use extract::{ExtractionOutcome, run_extraction};
pub use jid::{SessionIdentity, pure_number};
pub use output::{LidDocument, Persisted, ResolutionMethod, ResolvedMapping};
pub use registry::LidRegistry;
pub use resolver::{ResolutionReport, Resolver};
pub use store::IdentityStore;
