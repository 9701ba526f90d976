// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::arg;
use crate::models::{EntityId, EntityKind};
use crate::store::Store;
use anyhow::{Result, anyhow};

pub fn handle(store: &mut Store, m: &clap::ArgMatches) -> Result<()> {
    let raw_kind = arg::<String>(m, "kind")?;
    let kind = EntityKind::from_wire(raw_kind.trim())
        .ok_or_else(|| anyhow!("Unknown entity kind '{}'", raw_kind))?;
    let id = EntityId::parse(kind, arg::<String>(m, "id")?)?;
    store.delete(kind, id)?;
    println!("Deleted {} {}", kind, id);
    Ok(())
}
