// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use tracing::{debug, info};

use super::package::SyncPackage;
use crate::error::{LedgerError, Result};
use crate::models::{EntityKind, is_system_tag};
use crate::store::Store;
use crate::store::records::{self, binary_ids_since, small_ids_since};

/// Builds packages from the local store. Read-only.
pub struct Exporter<'a> {
    store: &'a Store,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Every row with `updated_at >= since` and every tombstone with
    /// `deleted_at >= since`. The bound is inclusive so same-second writes
    /// made after a push watermark was captured are sent again, not lost.
    pub fn export(&self, since: i64, sender_id: &str) -> Result<SyncPackage> {
        let conn = self.store.conn();
        let mut pkg = SyncPackage::new(sender_id, self.store.now(), since);

        let missing = |kind: EntityKind, id: String| LedgerError::not_found(kind, id);

        for id in small_ids_since(conn, EntityKind::Icon, since)? {
            pkg.icons.push(
                records::load_icon(conn, id)?
                    .ok_or_else(|| missing(EntityKind::Icon, id.to_string()))?,
            );
        }
        for id in small_ids_since(conn, EntityKind::Currency, since)? {
            pkg.currencies.push(
                records::load_currency(conn, id)?
                    .ok_or_else(|| missing(EntityKind::Currency, id.to_string()))?,
            );
        }
        for id in small_ids_since(conn, EntityKind::Tag, since)? {
            if is_system_tag(id) {
                continue;
            }
            pkg.tags.push(
                records::load_tag(conn, id)?
                    .ok_or_else(|| missing(EntityKind::Tag, id.to_string()))?,
            );
        }
        for id in small_ids_since(conn, EntityKind::Wallet, since)? {
            pkg.wallets.push(
                records::load_wallet(conn, id)?
                    .ok_or_else(|| missing(EntityKind::Wallet, id.to_string()))?,
            );
        }
        for id in small_ids_since(conn, EntityKind::Account, since)? {
            pkg.accounts.push(
                records::load_account(conn, id)?
                    .ok_or_else(|| missing(EntityKind::Account, id.to_string()))?,
            );
        }
        for id in small_ids_since(conn, EntityKind::Counterparty, since)? {
            pkg.counterparties.push(
                records::load_counterparty(conn, id)?
                    .ok_or_else(|| missing(EntityKind::Counterparty, id.to_string()))?,
            );
        }
        // lines ride along with their header whatever their own timestamps say
        for id in binary_ids_since(conn, EntityKind::Transaction, since)? {
            pkg.transactions.push(
                records::load_transaction(conn, &id)?
                    .ok_or_else(|| missing(EntityKind::Transaction, id.to_string()))?,
            );
        }
        for id in binary_ids_since(conn, EntityKind::Budget, since)? {
            pkg.budgets.push(
                records::load_budget(conn, &id)?
                    .ok_or_else(|| missing(EntityKind::Budget, id.to_string()))?,
            );
        }
        pkg.deletions = records::tombstones_since(conn, since)?;

        debug!(
            icons = pkg.icons.len(),
            currencies = pkg.currencies.len(),
            tags = pkg.tags.len(),
            wallets = pkg.wallets.len(),
            accounts = pkg.accounts.len(),
            counterparties = pkg.counterparties.len(),
            transactions = pkg.transactions.len(),
            budgets = pkg.budgets.len(),
            deletions = pkg.deletions.len(),
            "export groups"
        );
        info!(since, sender_id, records = pkg.record_count(), "exported sync package");
        Ok(pkg)
    }
}
