// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, params};
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Pocketledger", "pocketledger"));

/// Environment variable that points the CLI at a specific database file.
pub const DB_ENV: &str = "POCKETLEDGER_DB";

/// Reserved tags seeded on every device. Ids match `models::SYSTEM_TAG_IDS`.
pub const SYSTEM_TAGS: [(i64, &str); 11] = [
    (1, "Income"),
    (2, "Expense"),
    (3, "Transfer"),
    (4, "Initial balance"),
    (5, "Adjustment"),
    (6, "Fee"),
    (7, "Refund"),
    (8, "Exchange"),
    (9, "Debt"),
    (10, "Uncategorized"),
    (22, "Archived"),
];

pub const INITIAL_BALANCE_TAG: i64 = 4;

pub fn db_path() -> Result<PathBuf> {
    if let Some(p) = std::env::var_os(DB_ENV).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(p);
        if let Some(parent) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        return Ok(path);
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("pocketledger.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS icons(
        id INTEGER PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS currencies(
        id INTEGER PRIMARY KEY,
        code TEXT NOT NULL,
        name TEXT NOT NULL,
        symbol TEXT NOT NULL,
        decimal_places INTEGER NOT NULL DEFAULT 2,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tags(
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        icon INTEGER,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY(icon) REFERENCES icons(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS tag_edges(
        parent INTEGER NOT NULL,
        child INTEGER NOT NULL,
        PRIMARY KEY(parent, child),
        CHECK(parent != child),
        FOREIGN KEY(parent) REFERENCES tags(id) ON DELETE CASCADE,
        FOREIGN KEY(child) REFERENCES tags(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS wallets(
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        color INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS wallet_tags(
        wallet INTEGER NOT NULL,
        tag INTEGER NOT NULL,
        PRIMARY KEY(wallet, tag),
        FOREIGN KEY(wallet) REFERENCES wallets(id) ON DELETE CASCADE,
        FOREIGN KEY(tag) REFERENCES tags(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY,
        wallet INTEGER NOT NULL,
        currency INTEGER NOT NULL,
        balance INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY(wallet) REFERENCES wallets(id) ON DELETE CASCADE,
        FOREIGN KEY(currency) REFERENCES currencies(id)
    );

    CREATE TABLE IF NOT EXISTS account_tags(
        account INTEGER NOT NULL,
        tag INTEGER NOT NULL,
        PRIMARY KEY(account, tag),
        FOREIGN KEY(account) REFERENCES accounts(id) ON DELETE CASCADE,
        FOREIGN KEY(tag) REFERENCES tags(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS counterparties(
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS counterparty_notes(
        counterparty INTEGER PRIMARY KEY,
        note TEXT NOT NULL,
        FOREIGN KEY(counterparty) REFERENCES counterparties(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS counterparty_tags(
        counterparty INTEGER NOT NULL,
        tag INTEGER NOT NULL,
        PRIMARY KEY(counterparty, tag),
        FOREIGN KEY(counterparty) REFERENCES counterparties(id) ON DELETE CASCADE,
        FOREIGN KEY(tag) REFERENCES tags(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS trx(
        id BLOB PRIMARY KEY CHECK(length(id) = 8),
        timestamp INTEGER NOT NULL,
        counterparty INTEGER,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY(counterparty) REFERENCES counterparties(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS trx_notes(
        trx BLOB PRIMARY KEY,
        note TEXT NOT NULL,
        FOREIGN KEY(trx) REFERENCES trx(id) ON DELETE CASCADE
    );

    -- account/tag have no ON DELETE action: a referenced row cannot be removed
    CREATE TABLE IF NOT EXISTS trx_base(
        id BLOB PRIMARY KEY CHECK(length(id) = 8),
        trx BLOB NOT NULL,
        account INTEGER NOT NULL,
        tag INTEGER NOT NULL,
        sign TEXT NOT NULL CHECK(sign IN ('+','-')),
        amount INTEGER NOT NULL CHECK(amount >= 0),
        rate TEXT NOT NULL DEFAULT '1',
        updated_at INTEGER NOT NULL,
        FOREIGN KEY(trx) REFERENCES trx(id) ON DELETE CASCADE,
        FOREIGN KEY(account) REFERENCES accounts(id),
        FOREIGN KEY(tag) REFERENCES tags(id)
    );
    CREATE INDEX IF NOT EXISTS idx_trx_base_trx ON trx_base(trx);
    CREATE INDEX IF NOT EXISTS idx_trx_base_account ON trx_base(account);

    CREATE TABLE IF NOT EXISTS budgets(
        id BLOB PRIMARY KEY CHECK(length(id) = 8),
        start_at INTEGER NOT NULL,
        end_at INTEGER NOT NULL,
        tag INTEGER NOT NULL,
        amount INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        CHECK(start_at < end_at),
        FOREIGN KEY(tag) REFERENCES tags(id)
    );

    CREATE TABLE IF NOT EXISTS deletions(
        entity TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        deleted_at INTEGER NOT NULL,
        PRIMARY KEY(entity, entity_id)
    );
    CREATE INDEX IF NOT EXISTS idx_deletions_deleted_at ON deletions(deleted_at);

    CREATE TABLE IF NOT EXISTS sync_state(
        installation_id TEXT PRIMARY KEY,
        last_push_at INTEGER NOT NULL DEFAULT 0,
        last_sync_at INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_icons_updated ON icons(updated_at);
    CREATE INDEX IF NOT EXISTS idx_currencies_updated ON currencies(updated_at);
    CREATE INDEX IF NOT EXISTS idx_tags_updated ON tags(updated_at);
    CREATE INDEX IF NOT EXISTS idx_wallets_updated ON wallets(updated_at);
    CREATE INDEX IF NOT EXISTS idx_accounts_updated ON accounts(updated_at);
    CREATE INDEX IF NOT EXISTS idx_counterparties_updated ON counterparties(updated_at);
    CREATE INDEX IF NOT EXISTS idx_trx_updated ON trx(updated_at);
    CREATE INDEX IF NOT EXISTS idx_budgets_updated ON budgets(updated_at);
    "#,
    )?;

    let mut seed = conn.prepare(
        "INSERT OR IGNORE INTO tags(id, name, icon, updated_at) VALUES (?1, ?2, NULL, 0)",
    )?;
    for (id, name) in SYSTEM_TAGS {
        seed.execute(params![id, name])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SYSTEM_TAG_IDS;

    #[test]
    fn schema_is_reentrant_and_seeds_system_tags() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, SYSTEM_TAG_IDS.len() as i64);
        for (id, _) in SYSTEM_TAGS {
            assert!(SYSTEM_TAG_IDS.contains(&id));
        }
    }
}
