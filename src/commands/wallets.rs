// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::arg;
use crate::store::Store;
use crate::utils::{fmt_timestamp, pretty_table};
use anyhow::Result;

pub fn handle(store: &mut Store, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = arg::<String>(sub, "name")?.trim();
            let color = *arg::<i64>(sub, "color")?;
            let w = store.add_wallet(name, color, &[])?;
            println!("Added wallet '{}' (id {})", w.name, w.id);
        }
        Some(("rename", sub)) => {
            let id = *arg::<i64>(sub, "id")?;
            let name = arg::<String>(sub, "name")?.trim();
            let w = store.rename_wallet(id, name)?;
            println!("Renamed wallet {} to '{}'", w.id, w.name);
        }
        Some(("list", _)) => {
            let mut stmt = store.conn().prepare(
                "SELECT w.id, w.name, COUNT(a.id), w.updated_at FROM wallets w
                 LEFT JOIN accounts a ON a.wallet=w.id GROUP BY w.id ORDER BY w.name",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, i64>(2)?,
                    r.get::<_, i64>(3)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (id, name, accounts, updated) = row?;
                data.push(vec![
                    id.to_string(),
                    name,
                    accounts.to_string(),
                    fmt_timestamp(updated),
                ]);
            }
            println!(
                "{}",
                pretty_table(&["Id", "Name", "Accounts", "Updated"], data)
            );
        }
        _ => {}
    }
    Ok(())
}
