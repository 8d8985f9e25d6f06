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

//! Error types for the LID extractor
//!
//! Every fallible operation in the library returns [`LidError`]. The hierarchy
//! mirrors the three places a run can fail:
//!
//! - **Store**: connecting to or querying the session database
//! - **Config**: loading or validating configuration
//! - **Output**: reading or writing the LID document
//!
//! There is no retry or recovery logic: the first error aborts the run and is
//! reported by the caller. "No match found" is not an error and never appears
//! here.

use std::borrow::Cow;
use std::io;
use thiserror::Error;

/// Core error type for the LID extractor
#[derive(Debug, Error)]
pub enum LidError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

/// Database access errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(Cow<'static, str>),

    #[error("Connection failed: {0}")]
    ConnectionFailed(Cow<'static, str>),

    #[error("Query failed ({operation}): {reason}")]
    QueryFailed {
        operation: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("Store already closed")]
    Closed,
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("Parse error: {0}")]
    ParseError(Cow<'static, str>),

    #[error("IO error for {path}: {source}")]
    IoError {
        path: Cow<'static, str>,
        #[source]
        source: io::Error,
    },
}

/// LID document read/write errors
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error for {path}: {source}")]
    Io {
        path: Cow<'static, str>,
        #[source]
        source: io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(Cow<'static, str>),

    #[error("Malformed LID document {path}: {reason}")]
    Malformed {
        path: Cow<'static, str>,
        reason: Cow<'static, str>,
    },
}

impl StoreError {
    /// Wrap a driver error raised while running `operation`
    pub fn query(operation: &'static str, err: impl std::fmt::Display) -> Self {
        StoreError::QueryFailed {
            operation: operation.into(),
            reason: err.to_string().into(),
        }
    }
}

impl From<serde_json::Error> for LidError {
    fn from(err: serde_json::Error) -> Self {
        LidError::Output(OutputError::Serialization(err.to_string().into()))
    }
}

/// Result type alias for LID extractor operations
pub type Result<T> = std::result::Result<T, LidError>;
