// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::arg;
use crate::store::Store;
use crate::utils::pretty_table;
use anyhow::Result;

pub fn handle(store: &mut Store, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let code = arg::<String>(sub, "code")?.trim();
            let name = arg::<String>(sub, "name")?.trim();
            let symbol = arg::<String>(sub, "symbol")?.trim();
            let decimals = *arg::<i64>(sub, "decimals")?;
            let c = store.add_currency(code, name, symbol, decimals)?;
            println!("Added currency {} '{}' (id {})", c.code, c.name, c.id);
        }
        Some(("list", _)) => {
            let mut stmt = store.conn().prepare(
                "SELECT id, code, name, symbol, decimal_places FROM currencies ORDER BY code",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok(vec![
                    r.get::<_, i64>(0)?.to_string(),
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, i64>(4)?.to_string(),
                ])
            })?;
            let mut data = Vec::new();
            for row in rows {
                data.push(row?);
            }
            println!(
                "{}",
                pretty_table(&["Id", "Code", "Name", "Symbol", "Decimals"], data)
            );
        }
        _ => {}
    }
    Ok(())
}
