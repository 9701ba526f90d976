// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::models::SyncState;
use crate::store::Store;

/// Per-remote watermarks. Timestamps are always supplied by the caller: the
/// push watermark must be the time captured *before* the export ran.
pub struct SyncStateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SyncStateRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { conn: store.conn() }
    }

    pub fn ensure(&self, installation_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO sync_state(installation_id, last_push_at, last_sync_at)
             VALUES (?1, 0, 0)",
            params![installation_id],
        )?;
        Ok(())
    }

    pub fn get(&self, installation_id: &str) -> Result<Option<SyncState>> {
        Ok(self
            .conn
            .query_row(
                "SELECT last_push_at, last_sync_at FROM sync_state WHERE installation_id=?1",
                params![installation_id],
                |r| {
                    Ok(SyncState {
                        last_push_at: r.get(0)?,
                        last_sync_at: r.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn update_push_timestamp(&self, installation_id: &str, timestamp: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_state(installation_id, last_push_at, last_sync_at) VALUES (?1, ?2, 0)
             ON CONFLICT(installation_id) DO UPDATE SET last_push_at=excluded.last_push_at",
            params![installation_id, timestamp],
        )?;
        Ok(())
    }

    pub fn update_sync_timestamp(&self, installation_id: &str, timestamp: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_state(installation_id, last_push_at, last_sync_at) VALUES (?1, 0, ?2)
             ON CONFLICT(installation_id) DO UPDATE SET last_sync_at=excluded.last_sync_at",
            params![installation_id, timestamp],
        )?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<(String, SyncState)>> {
        let mut stmt = self.conn.prepare(
            "SELECT installation_id, last_push_at, last_sync_at FROM sync_state
             ORDER BY installation_id",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                SyncState {
                    last_push_at: r.get(1)?,
                    last_sync_at: r.get(2)?,
                },
            ))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
