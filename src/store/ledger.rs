// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Local edits. Each call is one SQLite transaction that stamps
//! `updated_at`, keeps balances and tombstones in step, and notifies observers.

use std::collections::BTreeSet;

use rusqlite::{Connection, params};
use rust_decimal::Decimal;

use super::records::{self, table_for};
use super::{Store, Touched};
use crate::error::{LedgerError, Result};
use crate::models::{
    Account, BinaryId, Budget, Counterparty, Currency, EntityId, EntityKind, Icon, Sign, Tag,
    Transaction, TransactionLine, Wallet, is_system_tag,
};
use crate::tags::TagGraph;

/// One leg of a transaction being recorded locally.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLine {
    pub account: i64,
    pub tag: i64,
    pub sign: Sign,
    pub amount: i64,
    pub rate: Decimal,
}

impl NewLine {
    /// Builds a line from a signed amount at rate 1.
    pub fn signed(account: i64, tag: i64, amount: i64) -> Self {
        let sign = if amount < 0 { Sign::Minus } else { Sign::Plus };
        Self {
            account,
            tag,
            sign,
            amount: amount.abs(),
            rate: Decimal::ONE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTransaction {
    pub timestamp: i64,
    pub counterparty: Option<i64>,
    pub note: Option<String>,
    pub lines: Vec<NewLine>,
}

fn next_small_id(conn: &Connection, kind: EntityKind) -> Result<i64> {
    let sql = format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {}", table_for(kind));
    Ok(conn.query_row(&sql, [], |r| r.get(0))?)
}

/// `updated_at` for a row being edited: never earlier than what it had.
fn stamp(conn: &Connection, kind: EntityKind, id: &EntityId, now: i64) -> Result<i64> {
    let previous = records::row_updated_at(conn, kind, id)?;
    Ok(previous.map_or(now, |p| p.max(now)))
}

fn build_lines(lines: Vec<NewLine>) -> Vec<TransactionLine> {
    lines
        .into_iter()
        .map(|l| TransactionLine {
            id: BinaryId::random(),
            account: l.account,
            tag: l.tag,
            sign: l.sign,
            amount: l.amount,
            rate: l.rate,
        })
        .collect()
}

fn count_refs(conn: &Connection, sql: &str, id: &EntityId) -> Result<i64> {
    Ok(conn.query_row(sql, params![id], |r| r.get(0))?)
}

fn referenced(kind: EntityKind, id: &EntityId, by: &'static str) -> LedgerError {
    LedgerError::ReferentialIntegrity {
        kind,
        id: id.to_string(),
        referenced_by: by,
    }
}

impl Store {
    pub fn add_icon(&mut self, value: &str) -> Result<Icon> {
        self.write(|conn, now, touched| {
            let icon = Icon {
                id: next_small_id(conn, EntityKind::Icon)?,
                value: value.to_string(),
                updated_at: now,
            };
            records::put_icon(conn, &icon)?;
            touched.push((EntityKind::Icon, icon.id.into()));
            Ok(icon)
        })
    }

    pub fn add_currency(
        &mut self,
        code: &str,
        name: &str,
        symbol: &str,
        decimal_places: i64,
    ) -> Result<Currency> {
        self.write(|conn, now, touched| {
            let currency = Currency {
                id: next_small_id(conn, EntityKind::Currency)?,
                code: code.to_uppercase(),
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimal_places,
                updated_at: Some(now),
            };
            records::put_currency(conn, &currency)?;
            touched.push((EntityKind::Currency, currency.id.into()));
            Ok(currency)
        })
    }

    pub fn add_tag(&mut self, name: &str, parents: &[i64], icon: Option<i64>) -> Result<Tag> {
        self.write(|conn, now, touched| {
            let id = next_small_id(conn, EntityKind::Tag)?;
            records::put_tag_row(
                conn,
                &Tag {
                    id,
                    name: name.to_string(),
                    updated_at: now,
                    parents: Vec::new(),
                    children: Vec::new(),
                    icon,
                },
            )?;
            let mut graph = TagGraph::load(conn)?;
            graph.replace_edges(id, parents, &[])?;
            graph.persist_edges_of(conn, id)?;
            touched.push((EntityKind::Tag, id.into()));
            records::load_tag(conn, id)?.ok_or_else(|| LedgerError::not_found(EntityKind::Tag, id))
        })
    }

    /// Adds `parent -> child`. Both tags carry the edge on the wire, so both are restamped.
    pub fn link_tags(&mut self, parent: i64, child: i64) -> Result<()> {
        self.write(|conn, now, touched| {
            for id in [parent, child] {
                if records::load_tag(conn, id)?.is_none() {
                    return Err(LedgerError::not_found(EntityKind::Tag, id));
                }
            }
            let mut graph = TagGraph::load(conn)?;
            graph.add_edge(parent, child)?;
            conn.execute(
                "INSERT OR IGNORE INTO tag_edges(parent, child) VALUES (?1, ?2)",
                params![parent, child],
            )?;
            for id in [parent, child] {
                if is_system_tag(id) {
                    continue;
                }
                let key = EntityId::Small(id);
                let ts = stamp(conn, EntityKind::Tag, &key, now)?;
                conn.execute(
                    "UPDATE tags SET updated_at=?2 WHERE id=?1",
                    params![id, ts],
                )?;
                touched.push((EntityKind::Tag, key));
            }
            Ok(())
        })
    }

    pub fn add_wallet(&mut self, name: &str, color: i64, tags: &[i64]) -> Result<Wallet> {
        self.write(|conn, now, touched| {
            let wallet = Wallet {
                id: next_small_id(conn, EntityKind::Wallet)?,
                name: name.to_string(),
                color,
                updated_at: now,
                tags: tags.to_vec(),
            };
            records::put_wallet(conn, &wallet)?;
            touched.push((EntityKind::Wallet, wallet.id.into()));
            Ok(wallet)
        })
    }

    pub fn rename_wallet(&mut self, id: i64, name: &str) -> Result<Wallet> {
        self.write(|conn, now, touched| {
            let mut wallet = records::load_wallet(conn, id)?
                .ok_or_else(|| LedgerError::not_found(EntityKind::Wallet, id))?;
            wallet.name = name.to_string();
            wallet.updated_at = wallet.updated_at.max(now);
            records::put_wallet(conn, &wallet)?;
            touched.push((EntityKind::Wallet, id.into()));
            Ok(wallet)
        })
    }

    pub fn add_account(&mut self, wallet: i64, currency: i64, tags: &[i64]) -> Result<Account> {
        self.write(|conn, now, touched| {
            let account = Account {
                id: next_small_id(conn, EntityKind::Account)?,
                wallet,
                currency,
                updated_at: now,
                tags: tags.to_vec(),
                balance: 0,
            };
            records::put_account(conn, &account)?;
            touched.push((EntityKind::Account, account.id.into()));
            Ok(account)
        })
    }

    pub fn add_counterparty(
        &mut self,
        name: &str,
        note: Option<&str>,
        tags: &[i64],
    ) -> Result<Counterparty> {
        self.write(|conn, now, touched| {
            let cp = Counterparty {
                id: next_small_id(conn, EntityKind::Counterparty)?,
                name: name.to_string(),
                note: note.map(str::to_string),
                updated_at: now,
                tags: tags.to_vec(),
            };
            records::put_counterparty(conn, &cp)?;
            touched.push((EntityKind::Counterparty, cp.id.into()));
            Ok(cp)
        })
    }

    pub fn record_transaction(&mut self, new: NewTransaction) -> Result<Transaction> {
        self.write(|conn, now, touched| {
            let trx = Transaction {
                id: BinaryId::random(),
                timestamp: new.timestamp,
                updated_at: now,
                counterparty: new.counterparty,
                note: new.note,
                lines: build_lines(new.lines),
            };
            records::put_transaction(conn, &trx)?;
            let accounts: BTreeSet<i64> = trx.lines.iter().map(|l| l.account).collect();
            for account in accounts {
                records::recompute_balance(conn, account)?;
            }
            touched.push((EntityKind::Transaction, trx.id.into()));
            Ok(trx)
        })
    }

    /// Swaps the whole line set of an existing transaction.
    pub fn replace_transaction_lines(
        &mut self,
        id: BinaryId,
        lines: Vec<NewLine>,
    ) -> Result<Transaction> {
        self.write(|conn, now, touched| {
            let mut trx = records::load_transaction(conn, &id)?
                .ok_or_else(|| LedgerError::not_found(EntityKind::Transaction, id))?;
            let mut accounts: BTreeSet<i64> = trx.lines.iter().map(|l| l.account).collect();
            trx.lines = build_lines(lines);
            trx.updated_at = trx.updated_at.max(now);
            accounts.extend(trx.lines.iter().map(|l| l.account));
            records::put_transaction(conn, &trx)?;
            for account in accounts {
                records::recompute_balance(conn, account)?;
            }
            touched.push((EntityKind::Transaction, id.into()));
            Ok(trx)
        })
    }

    pub fn add_budget(&mut self, tag: i64, amount: i64, start: i64, end: i64) -> Result<Budget> {
        if start >= end {
            return Err(LedgerError::invalid(format!(
                "budget window [{}, {}) is empty",
                start, end
            )));
        }
        self.write(|conn, now, touched| {
            let budget = Budget {
                id: BinaryId::random(),
                start,
                end,
                tag,
                amount,
                updated_at: now,
            };
            records::put_budget(conn, &budget)?;
            touched.push((EntityKind::Budget, budget.id.into()));
            Ok(budget)
        })
    }

    /// Removes a row, leaving a tombstone so the deletion propagates.
    pub fn delete(&mut self, kind: EntityKind, id: EntityId) -> Result<()> {
        self.write(|conn, now, touched| {
            if records::row_updated_at(conn, kind, &id)?.is_none() {
                return Err(LedgerError::not_found(kind, id));
            }
            match kind {
                EntityKind::Tag => {
                    if matches!(id, EntityId::Small(t) if is_system_tag(t)) {
                        return Err(LedgerError::invalid(format!(
                            "tag {} is a system tag",
                            id
                        )));
                    }
                    if count_refs(conn, "SELECT COUNT(*) FROM trx_base WHERE tag=?1", &id)? > 0 {
                        return Err(referenced(kind, &id, "transaction lines"));
                    }
                    if count_refs(conn, "SELECT COUNT(*) FROM budgets WHERE tag=?1", &id)? > 0 {
                        return Err(referenced(kind, &id, "budgets"));
                    }
                }
                EntityKind::Account => {
                    if count_refs(conn, "SELECT COUNT(*) FROM trx_base WHERE account=?1", &id)? > 0 {
                        return Err(referenced(kind, &id, "transaction lines"));
                    }
                }
                EntityKind::Currency => {
                    if count_refs(conn, "SELECT COUNT(*) FROM accounts WHERE currency=?1", &id)? > 0 {
                        return Err(referenced(kind, &id, "accounts"));
                    }
                }
                EntityKind::Wallet => {
                    let used = count_refs(
                        conn,
                        "SELECT COUNT(*) FROM trx_base b JOIN accounts a ON a.id=b.account
                         WHERE a.wallet=?1",
                        &id,
                    )?;
                    if used > 0 {
                        return Err(referenced(kind, &id, "transaction lines"));
                    }
                    let mut stmt = conn.prepare("SELECT id FROM accounts WHERE wallet=?1")?;
                    let accounts = stmt
                        .query_map(params![id], |r| r.get::<_, i64>(0))?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    for account in accounts {
                        let key = EntityId::Small(account);
                        records::record_tombstone(conn, EntityKind::Account, &key, now)?;
                        touched.push((EntityKind::Account, key));
                    }
                }
                EntityKind::Icon => {
                    conn.execute(
                        "UPDATE tags SET updated_at=MAX(updated_at, ?2) WHERE icon=?1",
                        params![id, now],
                    )?;
                }
                EntityKind::Counterparty => {
                    conn.execute(
                        "UPDATE trx SET updated_at=MAX(updated_at, ?2) WHERE counterparty=?1",
                        params![id, now],
                    )?;
                }
                EntityKind::Transaction | EntityKind::Budget => {}
            }

            let accounts = match id {
                EntityId::Binary(trx) if kind == EntityKind::Transaction => {
                    records::line_accounts(conn, &trx)?
                }
                _ => Vec::new(),
            };
            records::delete_row(conn, kind, &id)?;
            for account in accounts {
                records::recompute_balance(conn, account)?;
            }
            records::record_tombstone(conn, kind, &id, now)?;
            touched.push((kind, id));
            Ok(())
        })
    }

    /// Rewrites every stored balance from its lines. Balances are derived, so
    /// nothing is stamped or notified.
    pub fn recompute_balances(&mut self) -> Result<usize> {
        self.write(|conn, _, _| {
            let mut stmt = conn.prepare("SELECT id FROM accounts")?;
            let ids = stmt
                .query_map([], |r| r.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for id in &ids {
                records::recompute_balance(conn, *id)?;
            }
            Ok(ids.len())
        })
    }

    pub fn account(&self, id: i64) -> Result<Option<Account>> {
        records::load_account(self.conn(), id)
    }

    pub fn transaction(&self, id: &BinaryId) -> Result<Option<Transaction>> {
        records::load_transaction(self.conn(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ManualClock;

    fn store_at(ts: i64) -> (Store, ManualClock) {
        let clock = ManualClock::new(ts);
        let store = Store::open_in_memory().unwrap().with_clock(clock.clone());
        (store, clock)
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let (mut store, clock) = store_at(1_000);
        let wallet = store.add_wallet("Cash", 0, &[]).unwrap();
        clock.set(900);
        let renamed = store.rename_wallet(wallet.id, "Pocket").unwrap();
        assert_eq!(renamed.updated_at, 1_000);
        clock.set(1_200);
        let renamed = store.rename_wallet(wallet.id, "Purse").unwrap();
        assert_eq!(renamed.updated_at, 1_200);
    }

    #[test]
    fn user_tags_are_numbered_after_system_tags() {
        let (mut store, _) = store_at(10);
        let tag = store.add_tag("Groceries", &[2], None).unwrap();
        assert_eq!(tag.id, 23);
        assert_eq!(tag.parents, vec![2]);
    }

    #[test]
    fn system_tags_cannot_be_deleted() {
        let (mut store, _) = store_at(10);
        assert!(store.delete(EntityKind::Tag, EntityId::Small(4)).is_err());
    }
}
