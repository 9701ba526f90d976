// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Account, Budget, Counterparty, Currency, Icon, Tag, Tombstone, Transaction, Wallet};

pub const PROTOCOL_VERSION: u32 = 1;

/// Self-contained bundle of rows changed, and rows deleted, since a watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPackage {
    pub version: u32,
    pub sender_id: String,
    pub created_at: i64,
    pub since: i64,
    #[serde(default)]
    pub icons: Vec<Icon>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub wallets: Vec<Wallet>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub counterparties: Vec<Counterparty>,
    #[serde(default)]
    pub currencies: Vec<Currency>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub deletions: Vec<Tombstone>,
}

impl SyncPackage {
    pub fn new(sender_id: impl Into<String>, created_at: i64, since: i64) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            sender_id: sender_id.into(),
            created_at,
            since,
            icons: Vec::new(),
            tags: Vec::new(),
            wallets: Vec::new(),
            accounts: Vec::new(),
            counterparties: Vec::new(),
            currencies: Vec::new(),
            transactions: Vec::new(),
            budgets: Vec::new(),
            deletions: Vec::new(),
        }
    }

    pub fn record_count(&self) -> usize {
        self.icons.len()
            + self.tags.len()
            + self.wallets.len()
            + self.accounts.len()
            + self.counterparties.len()
            + self.currencies.len()
            + self.transactions.len()
            + self.budgets.len()
            + self.deletions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Rows applied per entity group. Skipped rows (stale or already applied) are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    pub icons: usize,
    pub currencies: usize,
    pub tags: usize,
    pub wallets: usize,
    pub accounts: usize,
    pub counterparties: usize,
    pub transactions: usize,
    pub budgets: usize,
    pub deletions: usize,
}

impl ImportCounts {
    pub fn total(&self) -> usize {
        self.icons
            + self.currencies
            + self.tags
            + self.wallets
            + self.accounts
            + self.counterparties
            + self.transactions
            + self.budgets
            + self.deletions
    }
}

/// Outcome of one import. A non-empty `errors` means nothing was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: ImportCounts,
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn applied(imported: ImportCounts) -> Self {
        Self {
            imported,
            errors: Vec::new(),
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            imported: ImportCounts::default(),
            errors: vec![error.to_string()],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_shape_with_missing_groups() {
        let raw = r#"{
            "version": 1, "sender_id": "A", "created_at": 100, "since": 0,
            "transactions": [{
                "id": "00000000000000AA", "timestamp": 90, "updated_at": 95,
                "counterparty": null, "note": null,
                "lines": [{"id": "00000000000000AB", "account": 1, "tag": 4,
                           "sign": "+", "amount": 1000, "rate": 1.0}]
            }],
            "deletions": [{"entity": "gizmo", "entity_id": "7", "deleted_at": 99}]
        }"#;
        let pkg: SyncPackage = serde_json::from_str(raw).unwrap();
        assert_eq!(pkg.transactions[0].lines[0].signed_amount(), 1000);
        assert!(pkg.wallets.is_empty());
        assert_eq!(pkg.record_count(), 2);
        let back = serde_json::to_value(&pkg).unwrap();
        assert_eq!(back["deletions"][0]["entity"], "gizmo");
        assert_eq!(back["transactions"][0]["id"], "00000000000000AA");
        assert!(back["tags"].as_array().unwrap().is_empty());
    }
}
