// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use pocketledger::{Store, cli, commands, db};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let path = db::db_path()?;
    let mut store = Store::new(db::open_or_init()?)
        .with_context(|| format!("Prepare DB at {}", path.display()))?;

    if let Some(("init", _)) = matches.subcommand() {
        println!("Database initialized at {}", path.display());
        println!("Installation id {}", store.installation_id()?);
        return Ok(());
    }
    if !commands::dispatch(&mut store, &matches)? {
        cli::build_cli().print_help()?;
        println!();
    }
    Ok(())
}
