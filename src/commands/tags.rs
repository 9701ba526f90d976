// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::arg;
use crate::models::is_system_tag;
use crate::store::Store;
use crate::tags::TagGraph;
use crate::utils::pretty_table;
use anyhow::Result;

pub fn handle(store: &mut Store, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = arg::<String>(sub, "name")?.trim();
            let parents: Vec<i64> = sub
                .get_many::<i64>("parent")
                .map(|v| v.copied().collect())
                .unwrap_or_default();
            let tag = store.add_tag(name, &parents, None)?;
            println!("Added tag '{}' (id {})", tag.name, tag.id);
        }
        Some(("link", sub)) => {
            let parent = *arg::<i64>(sub, "parent")?;
            let child = *arg::<i64>(sub, "child")?;
            store.link_tags(parent, child)?;
            println!("Linked tag {} under {}", child, parent);
        }
        Some(("list", _)) => {
            let graph = TagGraph::load(store.conn())?;
            let mut stmt = store.conn().prepare("SELECT id, name FROM tags ORDER BY id")?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?;
            let mut data = Vec::new();
            for row in rows {
                let (id, name) = row?;
                let parents = graph
                    .parents(id)
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                let system = if is_system_tag(id) { "yes" } else { "" };
                data.push(vec![id.to_string(), name, parents, system.to_string()]);
            }
            println!(
                "{}",
                pretty_table(&["Id", "Name", "Parents", "System"], data)
            );
        }
        _ => {}
    }
    Ok(())
}
