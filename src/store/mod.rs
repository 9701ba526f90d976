// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The entity store: one SQLite connection plus the clock and the
//! write-notification hook that local edits go through.

pub mod ledger;
pub mod records;

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use rand::RngCore;
use rusqlite::{Connection, OptionalExtension, params};

use crate::db::init_schema;
use crate::error::Result;
use crate::models::{EntityId, EntityKind};

/// Source of `updated_at` / `deleted_at` stamps, in Unix seconds.
pub trait Clock {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Settable clock; clones share the same time.
#[derive(Debug, Default, Clone)]
pub struct ManualClock(Rc<Cell<i64>>);

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self(Rc::new(Cell::new(now)))
    }

    pub fn set(&self, now: i64) {
        self.0.set(now);
    }

    pub fn advance(&self, secs: i64) {
        self.0.set(self.0.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.get()
    }
}

/// Hook called after every committed local mutation, typically to schedule a push.
pub trait WriteObserver {
    fn on_write(&self, kind: EntityKind, id: &EntityId);
}

#[derive(Default)]
struct WriteNotifier {
    observers: Vec<Box<dyn WriteObserver>>,
    suppressed: Cell<u32>,
}

impl WriteNotifier {
    fn notify(&self, kind: EntityKind, id: &EntityId) {
        if self.suppressed.get() > 0 {
            return;
        }
        for observer in &self.observers {
            observer.on_write(kind, id);
        }
    }

    fn suppress(&self) -> Suppressed<'_> {
        self.suppressed.set(self.suppressed.get() + 1);
        Suppressed(&self.suppressed)
    }
}

/// Keeps write notifications muted until dropped.
pub struct Suppressed<'a>(&'a Cell<u32>);

impl Drop for Suppressed<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Rows touched by one local unit of work, reported to observers on commit.
pub type Touched = Vec<(EntityKind, EntityId)>;

pub struct Store {
    conn: Connection,
    clock: Box<dyn Clock>,
    notifier: WriteNotifier,
}

impl Store {
    pub fn new(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn,
            clock: Box::new(SystemClock),
            notifier: WriteNotifier::default(),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn subscribe(&mut self, observer: impl WriteObserver + 'static) {
        self.notifier.observers.push(Box::new(observer));
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Opens the single atomic unit of work used to merge a package. Write
    /// notifications stay muted for as long as the returned guard lives.
    pub(crate) fn merge_session(&mut self) -> Result<(rusqlite::Transaction<'_>, Suppressed<'_>)> {
        let quiet = self.notifier.suppress();
        let tx = self.conn.transaction()?;
        Ok((tx, quiet))
    }

    /// Runs a local edit in its own SQLite transaction and notifies observers
    /// once it has committed.
    pub(crate) fn write<T>(
        &mut self,
        f: impl FnOnce(&Connection, i64, &mut Touched) -> Result<T>,
    ) -> Result<T> {
        let now = self.clock.now();
        let mut touched = Touched::new();
        let tx = self.conn.transaction()?;
        let out = f(&tx, now, &mut touched)?;
        tx.commit()?;
        for (kind, id) in &touched {
            self.notifier.notify(*kind, id);
        }
        Ok(out)
    }

    /// This device's identity, created on first use and kept in `settings`.
    pub fn installation_id(&self) -> Result<String> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key='installation_id'",
                [],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let id = hex::encode_upper(bytes);
        self.conn.execute(
            "INSERT INTO settings(key, value) VALUES('installation_id', ?1)",
            params![id],
        )?;
        Ok(id)
    }
}
