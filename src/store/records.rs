// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Row-level reads and writes shared by local edits, export and import.
//!
//! Nothing here stamps timestamps or fires notifications; callers pass the
//! `updated_at` they want stored.

use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::models::{
    Account, BinaryId, Budget, Counterparty, Currency, EntityId, EntityKind, Icon, Sign, Tag,
    Tombstone, Transaction, TransactionLine, Wallet,
};

pub(crate) fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Icon => "icons",
        EntityKind::Currency => "currencies",
        EntityKind::Tag => "tags",
        EntityKind::Wallet => "wallets",
        EntityKind::Account => "accounts",
        EntityKind::Counterparty => "counterparties",
        EntityKind::Transaction => "trx",
        EntityKind::Budget => "budgets",
    }
}

pub fn row_updated_at(conn: &Connection, kind: EntityKind, id: &EntityId) -> Result<Option<i64>> {
    let sql = format!("SELECT updated_at FROM {} WHERE id=?1", table_for(kind));
    Ok(conn
        .query_row(&sql, params![id], |r| r.get(0))
        .optional()?)
}

/// Ids of rows of `kind` with `updated_at >= since`, in id order.
pub(crate) fn small_ids_since(conn: &Connection, kind: EntityKind, since: i64) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT id FROM {} WHERE updated_at >= ?1 ORDER BY id",
        table_for(kind)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![since], |r| r.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub(crate) fn binary_ids_since(
    conn: &Connection,
    kind: EntityKind,
    since: i64,
) -> Result<Vec<BinaryId>> {
    let sql = format!(
        "SELECT id FROM {} WHERE updated_at >= ?1 ORDER BY updated_at, id",
        table_for(kind)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![since], |r| r.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn delete_row(conn: &Connection, kind: EntityKind, id: &EntityId) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id=?1", table_for(kind));
    Ok(conn.execute(&sql, params![id])? > 0)
}

/// Names the first kind of row that still points at `id`, if any.
pub fn first_dependent(
    conn: &Connection,
    kind: EntityKind,
    id: &EntityId,
) -> Result<Option<&'static str>> {
    let checks: &[(&str, &'static str)] = match kind {
        EntityKind::Icon => &[("SELECT EXISTS(SELECT 1 FROM tags WHERE icon=?1)", "tags")],
        EntityKind::Currency => &[(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE currency=?1)",
            "accounts",
        )],
        EntityKind::Tag => &[
            (
                "SELECT EXISTS(SELECT 1 FROM trx_base WHERE tag=?1)",
                "transaction lines",
            ),
            ("SELECT EXISTS(SELECT 1 FROM budgets WHERE tag=?1)", "budgets"),
        ],
        EntityKind::Wallet => &[(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE wallet=?1)",
            "accounts",
        )],
        EntityKind::Account => &[(
            "SELECT EXISTS(SELECT 1 FROM trx_base WHERE account=?1)",
            "transaction lines",
        )],
        EntityKind::Counterparty => &[(
            "SELECT EXISTS(SELECT 1 FROM trx WHERE counterparty=?1)",
            "transactions",
        )],
        EntityKind::Transaction | EntityKind::Budget => &[],
    };
    for &(sql, by) in checks {
        let found: bool = conn.query_row(sql, params![id], |r| r.get(0))?;
        if found {
            return Ok(Some(by));
        }
    }
    Ok(None)
}

/// Raises the row's `updated_at` to at least `at`.
pub fn touch_row(conn: &Connection, kind: EntityKind, id: &EntityId, at: i64) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET updated_at=MAX(updated_at, ?2) WHERE id=?1",
        table_for(kind)
    );
    conn.execute(&sql, params![id, at])?;
    Ok(())
}

fn load_links(conn: &Connection, table: &str, owner_col: &str, owner: i64) -> Result<Vec<i64>> {
    let sql = format!("SELECT tag FROM {table} WHERE {owner_col}=?1 ORDER BY tag");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner], |r| r.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn replace_links(
    conn: &Connection,
    table: &str,
    owner_col: &str,
    owner: i64,
    tags: &[i64],
) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE {owner_col}=?1"),
        params![owner],
    )?;
    let mut insert = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {table}({owner_col}, tag) VALUES (?1, ?2)"
    ))?;
    for tag in tags {
        insert.execute(params![owner, tag])?;
    }
    Ok(())
}

// Icons

pub fn load_icon(conn: &Connection, id: i64) -> Result<Option<Icon>> {
    Ok(conn
        .query_row(
            "SELECT id, value, updated_at FROM icons WHERE id=?1",
            params![id],
            |r| {
                Ok(Icon {
                    id: r.get(0)?,
                    value: r.get(1)?,
                    updated_at: r.get(2)?,
                })
            },
        )
        .optional()?)
}

pub fn put_icon(conn: &Connection, icon: &Icon) -> Result<()> {
    conn.execute(
        "INSERT INTO icons(id, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
        params![icon.id, icon.value, icon.updated_at],
    )?;
    Ok(())
}

// Currencies

pub fn load_currency(conn: &Connection, id: i64) -> Result<Option<Currency>> {
    Ok(conn
        .query_row(
            "SELECT id, code, name, symbol, decimal_places, updated_at FROM currencies WHERE id=?1",
            params![id],
            |r| {
                Ok(Currency {
                    id: r.get(0)?,
                    code: r.get(1)?,
                    name: r.get(2)?,
                    symbol: r.get(3)?,
                    decimal_places: r.get(4)?,
                    updated_at: Some(r.get(5)?),
                })
            },
        )
        .optional()?)
}

pub fn put_currency(conn: &Connection, currency: &Currency) -> Result<()> {
    conn.execute(
        "INSERT INTO currencies(id, code, name, symbol, decimal_places, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET code=excluded.code, name=excluded.name,
            symbol=excluded.symbol, decimal_places=excluded.decimal_places,
            updated_at=excluded.updated_at",
        params![
            currency.id,
            currency.code,
            currency.name,
            currency.symbol,
            currency.decimal_places,
            currency.updated_at.unwrap_or(0)
        ],
    )?;
    Ok(())
}

// Tags

pub fn load_tag(conn: &Connection, id: i64) -> Result<Option<Tag>> {
    let row: Option<(i64, String, Option<i64>, i64)> = conn
        .query_row(
            "SELECT id, name, icon, updated_at FROM tags WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;
    let Some((id, name, icon, updated_at)) = row else {
        return Ok(None);
    };
    let edges = |sql: &str| -> Result<Vec<i64>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![id], |r| r.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    };
    Ok(Some(Tag {
        id,
        name,
        updated_at,
        parents: edges("SELECT parent FROM tag_edges WHERE child=?1 ORDER BY parent")?,
        children: edges("SELECT child FROM tag_edges WHERE parent=?1 ORDER BY child")?,
        icon,
    }))
}

/// Writes the tag row only; edges go through [`crate::tags::TagGraph`].
pub fn put_tag_row(conn: &Connection, tag: &Tag) -> Result<()> {
    conn.execute(
        "INSERT INTO tags(id, name, icon, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET name=excluded.name, icon=excluded.icon,
            updated_at=excluded.updated_at",
        params![tag.id, tag.name, tag.icon, tag.updated_at],
    )?;
    Ok(())
}

// Wallets

pub fn load_wallet(conn: &Connection, id: i64) -> Result<Option<Wallet>> {
    let row: Option<(i64, String, i64, i64)> = conn
        .query_row(
            "SELECT id, name, color, updated_at FROM wallets WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;
    row.map(|(id, name, color, updated_at)| -> Result<Wallet> {
        Ok(Wallet {
            id,
            name,
            color,
            updated_at,
            tags: load_links(conn, "wallet_tags", "wallet", id)?,
        })
    })
    .transpose()
}

pub fn put_wallet(conn: &Connection, wallet: &Wallet) -> Result<()> {
    conn.execute(
        "INSERT INTO wallets(id, name, color, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET name=excluded.name, color=excluded.color,
            updated_at=excluded.updated_at",
        params![wallet.id, wallet.name, wallet.color, wallet.updated_at],
    )?;
    replace_links(conn, "wallet_tags", "wallet", wallet.id, &wallet.tags)
}

// Accounts

pub fn load_account(conn: &Connection, id: i64) -> Result<Option<Account>> {
    let row: Option<(i64, i64, i64, i64, i64)> = conn
        .query_row(
            "SELECT id, wallet, currency, updated_at, balance FROM accounts WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .optional()?;
    row.map(|(id, wallet, currency, updated_at, balance)| -> Result<Account> {
        Ok(Account {
            id,
            wallet,
            currency,
            updated_at,
            tags: load_links(conn, "account_tags", "account", id)?,
            balance,
        })
    })
    .transpose()
}

/// Upserts the account row and its tag links. The stored balance is left
/// untouched; see [`recompute_balance`].
pub fn put_account(conn: &Connection, account: &Account) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts(id, wallet, currency, balance, updated_at) VALUES (?1, ?2, ?3, 0, ?4)
         ON CONFLICT(id) DO UPDATE SET wallet=excluded.wallet, currency=excluded.currency,
            updated_at=excluded.updated_at",
        params![
            account.id,
            account.wallet,
            account.currency,
            account.updated_at
        ],
    )?;
    replace_links(conn, "account_tags", "account", account.id, &account.tags)
}

/// Sets the stored balance to the signed sum of the account's current lines.
pub fn recompute_balance(conn: &Connection, account: i64) -> Result<i64> {
    let balance: i64 = conn.query_row(
        "SELECT COALESCE(SUM(CASE sign WHEN '+' THEN amount ELSE -amount END), 0)
         FROM trx_base WHERE account=?1",
        params![account],
        |r| r.get(0),
    )?;
    conn.execute(
        "UPDATE accounts SET balance=?2 WHERE id=?1",
        params![account, balance],
    )?;
    Ok(balance)
}

// Counterparties

pub fn load_counterparty(conn: &Connection, id: i64) -> Result<Option<Counterparty>> {
    let row: Option<(i64, String, i64, Option<String>)> = conn
        .query_row(
            "SELECT c.id, c.name, c.updated_at, n.note FROM counterparties c
             LEFT JOIN counterparty_notes n ON n.counterparty=c.id WHERE c.id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;
    row.map(|(id, name, updated_at, note)| -> Result<Counterparty> {
        Ok(Counterparty {
            id,
            name,
            note,
            updated_at,
            tags: load_links(conn, "counterparty_tags", "counterparty", id)?,
        })
    })
    .transpose()
}

pub fn put_counterparty(conn: &Connection, cp: &Counterparty) -> Result<()> {
    conn.execute(
        "INSERT INTO counterparties(id, name, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET name=excluded.name, updated_at=excluded.updated_at",
        params![cp.id, cp.name, cp.updated_at],
    )?;
    match cp.note.as_deref() {
        Some(note) => {
            conn.execute(
                "INSERT INTO counterparty_notes(counterparty, note) VALUES (?1, ?2)
                 ON CONFLICT(counterparty) DO UPDATE SET note=excluded.note",
                params![cp.id, note],
            )?;
        }
        None => {
            conn.execute(
                "DELETE FROM counterparty_notes WHERE counterparty=?1",
                params![cp.id],
            )?;
        }
    }
    replace_links(conn, "counterparty_tags", "counterparty", cp.id, &cp.tags)
}

// Transactions

pub fn load_lines(conn: &Connection, trx: &BinaryId) -> Result<Vec<TransactionLine>> {
    let mut stmt = conn.prepare(
        "SELECT id, account, tag, sign, amount, rate FROM trx_base WHERE trx=?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![trx], |r| {
        Ok((
            r.get::<_, BinaryId>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, Sign>(3)?,
            r.get::<_, i64>(4)?,
            r.get::<_, String>(5)?,
        ))
    })?;
    let mut lines = Vec::new();
    for row in rows {
        let (id, account, tag, sign, amount, rate) = row?;
        let rate = rate
            .parse::<Decimal>()
            .map_err(|_| LedgerError::invalid(format!("invalid rate '{}' on line {}", rate, id)))?;
        lines.push(TransactionLine {
            id,
            account,
            tag,
            sign,
            amount,
            rate,
        });
    }
    Ok(lines)
}

pub fn line_accounts(conn: &Connection, trx: &BinaryId) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT DISTINCT account FROM trx_base WHERE trx=?1")?;
    let rows = stmt.query_map(params![trx], |r| r.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn load_transaction(conn: &Connection, id: &BinaryId) -> Result<Option<Transaction>> {
    let row: Option<(BinaryId, i64, Option<i64>, i64, Option<String>)> = conn
        .query_row(
            "SELECT t.id, t.timestamp, t.counterparty, t.updated_at, n.note FROM trx t
             LEFT JOIN trx_notes n ON n.trx=t.id WHERE t.id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .optional()?;
    row.map(|(id, timestamp, counterparty, updated_at, note)| -> Result<Transaction> {
        Ok(Transaction {
            id,
            timestamp,
            updated_at,
            counterparty,
            note,
            lines: load_lines(conn, &id)?,
        })
    })
    .transpose()
}

/// Upserts header, note and the complete line set of a transaction. Balances
/// are not touched.
pub fn put_transaction(conn: &Connection, trx: &Transaction) -> Result<()> {
    if trx.lines.is_empty() {
        return Err(LedgerError::invalid(format!(
            "transaction {} has no lines",
            trx.id
        )));
    }
    conn.execute(
        "INSERT INTO trx(id, timestamp, counterparty, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET timestamp=excluded.timestamp,
            counterparty=excluded.counterparty, updated_at=excluded.updated_at",
        params![trx.id, trx.timestamp, trx.counterparty, trx.updated_at],
    )?;
    match trx.note.as_deref() {
        Some(note) => {
            conn.execute(
                "INSERT INTO trx_notes(trx, note) VALUES (?1, ?2)
                 ON CONFLICT(trx) DO UPDATE SET note=excluded.note",
                params![trx.id, note],
            )?;
        }
        None => {
            conn.execute("DELETE FROM trx_notes WHERE trx=?1", params![trx.id])?;
        }
    }
    conn.execute("DELETE FROM trx_base WHERE trx=?1", params![trx.id])?;
    let mut insert = conn.prepare(
        "INSERT INTO trx_base(id, trx, account, tag, sign, amount, rate, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for line in &trx.lines {
        if line.amount < 0 {
            return Err(LedgerError::invalid(format!(
                "line {} has negative amount {}",
                line.id, line.amount
            )));
        }
        insert.execute(params![
            line.id,
            trx.id,
            line.account,
            line.tag,
            line.sign,
            line.amount,
            line.rate.to_string(),
            trx.updated_at
        ])?;
    }
    Ok(())
}

// Budgets

pub fn load_budget(conn: &Connection, id: &BinaryId) -> Result<Option<Budget>> {
    Ok(conn
        .query_row(
            "SELECT id, start_at, end_at, tag, amount, updated_at FROM budgets WHERE id=?1",
            params![id],
            |r| {
                Ok(Budget {
                    id: r.get(0)?,
                    start: r.get(1)?,
                    end: r.get(2)?,
                    tag: r.get(3)?,
                    amount: r.get(4)?,
                    updated_at: r.get(5)?,
                })
            },
        )
        .optional()?)
}

pub fn put_budget(conn: &Connection, budget: &Budget) -> Result<()> {
    conn.execute(
        "INSERT INTO budgets(id, start_at, end_at, tag, amount, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET start_at=excluded.start_at, end_at=excluded.end_at,
            tag=excluded.tag, amount=excluded.amount, updated_at=excluded.updated_at",
        params![
            budget.id,
            budget.start,
            budget.end,
            budget.tag,
            budget.amount,
            budget.updated_at
        ],
    )?;
    Ok(())
}

// Tombstones

/// Appends a tombstone; an existing one for the same row keeps the later time.
pub fn record_tombstone(
    conn: &Connection,
    kind: EntityKind,
    id: &EntityId,
    deleted_at: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO deletions(entity, entity_id, deleted_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(entity, entity_id) DO UPDATE SET
            deleted_at=MAX(deleted_at, excluded.deleted_at)",
        params![kind.as_str(), id.to_string(), deleted_at],
    )?;
    Ok(())
}

pub fn tombstones_since(conn: &Connection, since: i64) -> Result<Vec<Tombstone>> {
    let mut stmt = conn.prepare(
        "SELECT entity, entity_id, deleted_at FROM deletions
         WHERE deleted_at >= ?1 ORDER BY deleted_at, entity, entity_id",
    )?;
    let rows = stmt.query_map(params![since], |r| {
        Ok(Tombstone {
            entity: r.get::<_, String>(0)?.into(),
            entity_id: r.get(1)?,
            deleted_at: r.get(2)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
