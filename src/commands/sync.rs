// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::arg;
use crate::store::Store;
use crate::sync::{Exporter, Importer, SyncPackage, SyncStateRepository, prepare_push};
use crate::utils::{fmt_timestamp, maybe_print_json, parse_timestamp, pretty_table};
use anyhow::{Result, anyhow};
use serde::Serialize;

pub fn handle(store: &mut Store, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("export", sub)) => {
            let since = parse_timestamp(arg::<String>(sub, "since")?)?;
            let out = arg::<String>(sub, "out")?;
            let sender = match sub.get_one::<String>("sender") {
                Some(s) => s.clone(),
                None => store.installation_id()?,
            };
            let pkg = Exporter::new(store).export(since, &sender)?;
            pkg.write_to(out)?;
            println!("Exported {} records since {} to {}", pkg.record_count(), since, out);
        }
        Some(("import", sub)) => {
            let path = arg::<String>(sub, "path")?;
            let pkg = SyncPackage::read_from(path)?;
            let report = Importer::new(store).import(&pkg);
            if !report.is_ok() {
                return Err(anyhow!(
                    "Import of {} rolled back: {}",
                    path,
                    report.errors.join("; ")
                ));
            }
            SyncStateRepository::new(store).update_sync_timestamp(&pkg.sender_id, pkg.created_at)?;
            let c = report.imported;
            println!(
                "Imported {} records from '{}': icons {}, currencies {}, tags {}, wallets {}, accounts {}, counterparties {}, transactions {}, budgets {}, deletions {}",
                c.total(),
                pkg.sender_id,
                c.icons,
                c.currencies,
                c.tags,
                c.wallets,
                c.accounts,
                c.counterparties,
                c.transactions,
                c.budgets,
                c.deletions
            );
        }
        Some(("push", sub)) => {
            let to = arg::<String>(sub, "to")?;
            let out = arg::<String>(sub, "out")?;
            let sender = store.installation_id()?;
            let push = prepare_push(store, to, &sender)?;
            push.package.write_to(out)?;
            push.acknowledge(&SyncStateRepository::new(store))?;
            println!(
                "Wrote {} records for {} to {} (watermark {})",
                push.package.record_count(),
                to,
                out,
                push.watermark
            );
        }
        Some(("state", sub)) => {
            let data: Vec<StateRow> = SyncStateRepository::new(store)
                .list()?
                .into_iter()
                .map(|(installation_id, s)| StateRow {
                    installation_id,
                    last_push_at: s.last_push_at,
                    last_sync_at: s.last_sync_at,
                })
                .collect();
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|r| {
                        vec![
                            r.installation_id.clone(),
                            fmt_timestamp(r.last_push_at),
                            fmt_timestamp(r.last_sync_at),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Installation", "Last push", "Last sync"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
struct StateRow {
    installation_id: String,
    last_push_at: i64,
    last_sync_at: i64,
}
