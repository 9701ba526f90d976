// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::arg;
use crate::store::Store;
use anyhow::Result;

pub fn handle(store: &mut Store, m: &clap::ArgMatches) -> Result<()> {
    if let Some(("add", sub)) = m.subcommand() {
        let name = arg::<String>(sub, "name")?.trim();
        let note = sub
            .get_one::<String>("note")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());
        let cp = store.add_counterparty(name, note, &[])?;
        println!("Added counterparty '{}' (id {})", cp.name, cp.id);
    }
    Ok(())
}
