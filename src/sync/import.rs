// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Merging an incoming package into the local store.
//!
//! Groups are applied in foreign-key order (icons, currencies, tags, wallets,
//! accounts, counterparties, transactions, budgets) and deletions last. The
//! whole package is one SQLite transaction: any error rolls back every write
//! and is reported in [`ImportReport::errors`].

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::package::{ImportCounts, ImportReport, PROTOCOL_VERSION, SyncPackage};
use super::{deletion_wins, should_apply_lww};
use crate::error::{LedgerError, Result};
use crate::models::{DeletedEntity, EntityId, EntityKind, Tag, Tombstone, is_system_tag};
use crate::store::Store;
use crate::store::records;
use crate::tags::TagGraph;

pub struct Importer<'a> {
    store: &'a mut Store,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a mut Store) -> Self {
        Self { store }
    }

    pub fn import(&mut self, pkg: &SyncPackage) -> ImportReport {
        if pkg.version != PROTOCOL_VERSION {
            warn!(version = pkg.version, "rejecting sync package");
            return ImportReport::failed(LedgerError::UnsupportedVersion(pkg.version));
        }

        let now = self.store.now();
        let (tx, _quiet) = match self.store.merge_session() {
            Ok(session) => session,
            Err(e) => return ImportReport::failed(e),
        };
        let outcome = Merge::new(&tx, now).apply(pkg);
        let outcome = outcome.and_then(|counts| {
            tx.commit()?;
            Ok(counts)
        });

        match outcome {
            Ok(counts) => {
                info!(
                    sender_id = %pkg.sender_id,
                    created_at = pkg.created_at,
                    applied = counts.total(),
                    received = pkg.record_count(),
                    "imported sync package"
                );
                ImportReport::applied(counts)
            }
            Err(e) => {
                warn!(sender_id = %pkg.sender_id, error = %e, "sync package rolled back");
                ImportReport::failed(e)
            }
        }
    }
}

struct Merge<'c> {
    conn: &'c Connection,
    now: i64,
    counts: ImportCounts,
    /// Accounts whose line set may have changed; rebalanced at the end.
    dirty_accounts: BTreeSet<i64>,
}

impl<'c> Merge<'c> {
    fn new(conn: &'c Connection, now: i64) -> Self {
        Self {
            conn,
            now,
            counts: ImportCounts::default(),
            dirty_accounts: BTreeSet::new(),
        }
    }

    fn apply(mut self, pkg: &SyncPackage) -> Result<ImportCounts> {
        self.icons(pkg)?;
        self.currencies(pkg)?;
        self.tags(pkg)?;
        self.wallets(pkg)?;
        self.accounts(pkg)?;
        self.counterparties(pkg)?;
        self.transactions(pkg)?;
        self.budgets(pkg)?;
        self.deletions(&pkg.deletions)?;
        for account in &self.dirty_accounts {
            records::recompute_balance(self.conn, *account)?;
        }
        Ok(self.counts)
    }

    fn wins(&self, kind: EntityKind, id: EntityId, remote: i64) -> Result<bool> {
        let local = records::row_updated_at(self.conn, kind, &id)?;
        let apply = should_apply_lww(local, remote);
        if !apply {
            debug!(%kind, %id, remote, local, "skipping row, local copy is as new or newer");
        }
        Ok(apply)
    }

    fn icons(&mut self, pkg: &SyncPackage) -> Result<()> {
        for icon in &pkg.icons {
            if self.wins(EntityKind::Icon, icon.id.into(), icon.updated_at)? {
                records::put_icon(self.conn, icon)?;
                self.counts.icons += 1;
            }
        }
        Ok(())
    }

    fn currencies(&mut self, pkg: &SyncPackage) -> Result<()> {
        for currency in &pkg.currencies {
            let apply = match currency.updated_at {
                Some(remote) => self.wins(EntityKind::Currency, currency.id.into(), remote)?,
                None => records::load_currency(self.conn, currency.id)?.is_none(),
            };
            if apply {
                records::put_currency(self.conn, currency)?;
                self.counts.currencies += 1;
            }
        }
        Ok(())
    }

    /// Rows first, then edges, so an edge may point at a tag later in the list.
    fn tags(&mut self, pkg: &SyncPackage) -> Result<()> {
        let mut applied: Vec<&Tag> = Vec::new();
        for tag in &pkg.tags {
            if is_system_tag(tag.id) {
                debug!(id = tag.id, "ignoring system tag in package");
                continue;
            }
            if self.wins(EntityKind::Tag, tag.id.into(), tag.updated_at)? {
                records::put_tag_row(self.conn, tag)?;
                applied.push(tag);
            }
        }
        if applied.is_empty() {
            return Ok(());
        }

        let sent: BTreeMap<i64, i64> = pkg.tags.iter().map(|t| (t.id, t.updated_at)).collect();
        let mut graph = TagGraph::load(self.conn)?;
        let mut kept: Vec<(i64, i64)> = Vec::new();
        for tag in &applied {
            for parent in graph.parents(tag.id) {
                if self.edge_outlives(parent, &sent)? {
                    kept.push((parent, tag.id));
                }
            }
            for child in graph.children(tag.id) {
                if self.edge_outlives(child, &sent)? {
                    kept.push((tag.id, child));
                }
            }
        }
        for tag in &applied {
            let parents = self.existing_tags(&tag.parents)?;
            let children = self.existing_tags(&tag.children)?;
            graph.replace_edges(tag.id, &parents, &children)?;
        }
        for (parent, child) in kept {
            if graph.add_edge(parent, child).is_err() {
                debug!(parent, child, "dropping local tag edge that would close a cycle");
            }
        }
        for tag in &applied {
            graph.persist_edges_of(self.conn, tag.id)?;
        }
        self.counts.tags += applied.len();
        Ok(())
    }

    /// A local edge to `other` stays when the package says nothing newer
    /// about `other` than this device knows.
    fn edge_outlives(&self, other: i64, sent: &BTreeMap<i64, i64>) -> Result<bool> {
        if is_system_tag(other) {
            return Ok(false);
        }
        let Some(&remote) = sent.get(&other) else {
            return Ok(true);
        };
        let local = records::row_updated_at(self.conn, EntityKind::Tag, &other.into())?;
        Ok(local.is_some_and(|local| local > remote))
    }

    fn existing_tags(&self, ids: &[i64]) -> Result<Vec<i64>> {
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            if records::row_updated_at(self.conn, EntityKind::Tag, &id.into())?.is_some() {
                out.push(id);
            } else {
                debug!(id, "dropping edge to a tag this device does not have");
            }
        }
        Ok(out)
    }

    fn wallets(&mut self, pkg: &SyncPackage) -> Result<()> {
        for wallet in &pkg.wallets {
            if self.wins(EntityKind::Wallet, wallet.id.into(), wallet.updated_at)? {
                records::put_wallet(self.conn, wallet)?;
                self.counts.wallets += 1;
            }
        }
        Ok(())
    }

    fn accounts(&mut self, pkg: &SyncPackage) -> Result<()> {
        for account in &pkg.accounts {
            if self.wins(EntityKind::Account, account.id.into(), account.updated_at)? {
                records::put_account(self.conn, account)?;
                self.dirty_accounts.insert(account.id);
                self.counts.accounts += 1;
            }
        }
        Ok(())
    }

    fn counterparties(&mut self, pkg: &SyncPackage) -> Result<()> {
        for cp in &pkg.counterparties {
            if self.wins(EntityKind::Counterparty, cp.id.into(), cp.updated_at)? {
                records::put_counterparty(self.conn, cp)?;
                self.counts.counterparties += 1;
            }
        }
        Ok(())
    }

    fn transactions(&mut self, pkg: &SyncPackage) -> Result<()> {
        for trx in &pkg.transactions {
            if !self.wins(EntityKind::Transaction, trx.id.into(), trx.updated_at)? {
                continue;
            }
            // accounts of the lines being replaced need rebalancing too
            self.dirty_accounts
                .extend(records::line_accounts(self.conn, &trx.id)?);
            records::put_transaction(self.conn, trx)?;
            self.dirty_accounts
                .extend(trx.lines.iter().map(|l| l.account));
            self.counts.transactions += 1;
        }
        Ok(())
    }

    fn budgets(&mut self, pkg: &SyncPackage) -> Result<()> {
        for budget in &pkg.budgets {
            if self.wins(EntityKind::Budget, budget.id.into(), budget.updated_at)? {
                records::put_budget(self.conn, budget)?;
                self.counts.budgets += 1;
            }
        }
        Ok(())
    }

    /// Dependents go before what they depend on: budgets and transactions
    /// first, icons last.
    fn deletions(&mut self, deletions: &[Tombstone]) -> Result<()> {
        let mut known: Vec<(EntityKind, &Tombstone)> = Vec::with_capacity(deletions.len());
        for tombstone in deletions {
            match &tombstone.entity {
                DeletedEntity::Known(kind) => known.push((*kind, tombstone)),
                DeletedEntity::Unknown(name) => {
                    debug!(entity = %name, id = %tombstone.entity_id, "ignoring deletion of unknown entity kind");
                }
            }
        }
        known.sort_by_key(|(kind, t)| (std::cmp::Reverse(*kind), t.deleted_at));

        for (kind, tombstone) in known {
            let id = EntityId::parse(kind, &tombstone.entity_id)?;
            if matches!(id, EntityId::Small(t) if kind == EntityKind::Tag && is_system_tag(t)) {
                debug!(%id, "ignoring deletion of system tag");
                continue;
            }
            let Some(local) = records::row_updated_at(self.conn, kind, &id)? else {
                debug!(%kind, %id, "deletion target already absent");
                continue;
            };
            if !deletion_wins(local, tombstone.deleted_at) {
                debug!(%kind, %id, local, deleted_at = tombstone.deleted_at, "local edit outlives deletion");
                continue;
            }
            // rows edited here after the deletion still point at the target
            if let Some(by) = records::first_dependent(self.conn, kind, &id)? {
                debug!(%kind, %id, referenced_by = by, "keeping row that local edits still use");
                records::touch_row(self.conn, kind, &id, self.now)?;
                continue;
            }

            if let (EntityKind::Transaction, EntityId::Binary(trx)) = (kind, id) {
                self.dirty_accounts
                    .extend(records::line_accounts(self.conn, &trx)?);
            }
            records::delete_row(self.conn, kind, &id)?;
            records::record_tombstone(self.conn, kind, &id, tombstone.deleted_at)?;
            self.counts.deletions += 1;
        }
        Ok(())
    }
}
