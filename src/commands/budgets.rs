// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::arg;
use crate::store::Store;
use crate::utils::parse_timestamp;
use anyhow::{Context, Result};

pub fn handle(store: &mut Store, m: &clap::ArgMatches) -> Result<()> {
    if let Some(("add", sub)) = m.subcommand() {
        let tag = *arg::<i64>(sub, "tag")?;
        let raw = arg::<String>(sub, "amount")?.trim();
        let amount = raw
            .parse::<i64>()
            .with_context(|| format!("Invalid amount '{}', expected minor units", raw))?;
        let start = parse_timestamp(arg::<String>(sub, "start")?)?;
        let end = parse_timestamp(arg::<String>(sub, "end")?)?;
        let budget = store.add_budget(tag, amount, start, end)?;
        println!(
            "Budget {} set for tag {}: {} over [{}, {})",
            budget.id, tag, amount, start, end
        );
    }
    Ok(())
}
