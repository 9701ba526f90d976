// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store::Store;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: &'static str,
    pub detail: String,
}

pub fn handle(store: &mut Store, m: &clap::ArgMatches) -> Result<()> {
    if m.get_flag("fix") {
        let fixed = store.recompute_balances()?;
        println!("Recomputed {} account balances", fixed);
    }

    let issues = check(store.conn())?;
    if issues.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        let rows = issues
            .into_iter()
            .map(|i| vec![i.kind.to_string(), i.detail])
            .collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

pub fn check(conn: &Connection) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();

    // 1) Stored balance differs from the sum of lines
    let mut stmt = conn.prepare(
        "SELECT a.id, a.balance,
                COALESCE(SUM(CASE b.sign WHEN '-' THEN -b.amount ELSE b.amount END), 0)
         FROM accounts a LEFT JOIN trx_base b ON b.account=a.id
         GROUP BY a.id ORDER BY a.id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let stored: i64 = r.get(1)?;
        let derived: i64 = r.get(2)?;
        if stored != derived {
            issues.push(Issue {
                kind: "balance_mismatch",
                detail: format!("account {}: stored {}, lines sum to {}", id, stored, derived),
            });
        }
    }

    // 2) Lines pointing at rows that no longer exist
    let mut stmt2 = conn.prepare(
        "SELECT hex(b.trx), b.account, b.tag,
                a.id IS NULL, t.id IS NULL, x.id IS NULL
         FROM trx_base b
         LEFT JOIN accounts a ON a.id=b.account
         LEFT JOIN tags t ON t.id=b.tag
         LEFT JOIN trx x ON x.id=b.trx
         WHERE a.id IS NULL OR t.id IS NULL OR x.id IS NULL",
    )?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let trx: String = r.get(0)?;
        let account: i64 = r.get(1)?;
        let tag: i64 = r.get(2)?;
        if r.get::<_, bool>(3)? {
            issues.push(Issue {
                kind: "dangling_account",
                detail: format!("tx {} references account {}", trx, account),
            });
        }
        if r.get::<_, bool>(4)? {
            issues.push(Issue {
                kind: "dangling_tag",
                detail: format!("tx {} references tag {}", trx, tag),
            });
        }
        if r.get::<_, bool>(5)? {
            issues.push(Issue {
                kind: "orphan_line",
                detail: format!("line of missing tx {}", trx),
            });
        }
    }

    Ok(issues)
}
