// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Error types for the ledger store and the sync engine.

use thiserror::Error;

use crate::models::EntityKind;

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid binary id '{0}', expected 16 hex chars")]
    InvalidId(String),

    #[error("tag edge {parent} -> {child} would create a cycle")]
    TagCycle { parent: i64, child: i64 },

    #[error("{kind} {id} is still referenced by {referenced_by}")]
    ReferentialIntegrity {
        kind: EntityKind,
        id: String,
        referenced_by: &'static str,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("unsupported package version {0}")]
    UnsupportedVersion(u32),

    #[error("{0}")]
    Invalid(String),
}

impl LedgerError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
