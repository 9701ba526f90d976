// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod budgets;
pub mod counterparties;
pub mod currencies;
pub mod doctor;
pub mod remove;
pub mod sync;
pub mod tags;
pub mod transactions;
pub mod wallets;

use crate::store::Store;
use anyhow::{Result, anyhow};

/// Runs the handler for a parsed command line. Returns `false` when no
/// handler matched.
pub fn dispatch(store: &mut Store, matches: &clap::ArgMatches) -> Result<bool> {
    match matches.subcommand() {
        Some(("currency", sub)) => currencies::handle(store, sub)?,
        Some(("tag", sub)) => tags::handle(store, sub)?,
        Some(("wallet", sub)) => wallets::handle(store, sub)?,
        Some(("account", sub)) => accounts::handle(store, sub)?,
        Some(("counterparty", sub)) => counterparties::handle(store, sub)?,
        Some(("tx", sub)) => transactions::handle(store, sub)?,
        Some(("budget", sub)) => budgets::handle(store, sub)?,
        Some(("rm", sub)) => remove::handle(store, sub)?,
        Some(("sync", sub)) => sync::handle(store, sub)?,
        Some(("doctor", sub)) => doctor::handle(store, sub)?,
        _ => return Ok(false),
    }
    Ok(true)
}

/// A required argument; clap enforces presence, this keeps handlers free of unwraps.
pub(crate) fn arg<'a, T: Clone + Send + Sync + 'static>(
    m: &'a clap::ArgMatches,
    id: &str,
) -> Result<&'a T> {
    m.get_one::<T>(id)
        .ok_or_else(|| anyhow!("missing required argument --{}", id))
}
