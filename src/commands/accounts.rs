// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::arg;
use crate::db::INITIAL_BALANCE_TAG;
use crate::store::Store;
use crate::store::ledger::{NewLine, NewTransaction};
use crate::utils::{fmt_minor_units, maybe_print_json, parse_minor_units, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;

pub fn handle(store: &mut Store, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(store, sub)?,
        Some(("list", sub)) => {
            let data = query_rows(store.conn())?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|a| {
                        vec![
                            a.id.to_string(),
                            a.wallet.clone(),
                            a.currency.clone(),
                            a.balance.clone(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Id", "Wallet", "Currency", "Balance"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

fn add(store: &mut Store, sub: &clap::ArgMatches) -> Result<()> {
    let wallet = *arg::<i64>(sub, "wallet")?;
    let currency = *arg::<i64>(sub, "currency")?;
    let decimals = currency_decimals(store.conn(), currency)?;
    let initial = sub
        .get_one::<String>("initial")
        .map(|s| parse_minor_units(s, decimals))
        .transpose()?;

    let account = store.add_account(wallet, currency, &[])?;
    println!("Added account {} in wallet {}", account.id, wallet);

    if let Some(amount) = initial.filter(|a| *a != 0) {
        let now = store.now();
        store.record_transaction(NewTransaction {
            timestamp: now,
            lines: vec![NewLine::signed(account.id, INITIAL_BALANCE_TAG, amount)],
            ..NewTransaction::default()
        })?;
        println!(
            "Initial balance {}",
            fmt_minor_units(amount, decimals)
        );
    }
    Ok(())
}

pub(crate) fn currency_decimals(conn: &Connection, currency: i64) -> Result<u32> {
    let places: i64 = conn
        .query_row(
            "SELECT decimal_places FROM currencies WHERE id=?1",
            params![currency],
            |r| r.get(0),
        )
        .with_context(|| format!("Currency {} not found", currency))?;
    u32::try_from(places).with_context(|| format!("Currency {} has invalid decimal places", currency))
}

#[derive(Serialize)]
pub struct AccountRow {
    pub id: i64,
    pub wallet: String,
    pub currency: String,
    pub balance: String,
    pub balance_minor: i64,
}

pub fn query_rows(conn: &Connection) -> Result<Vec<AccountRow>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, w.name, c.code, c.decimal_places, a.balance FROM accounts a
         JOIN wallets w ON w.id=a.wallet JOIN currencies c ON c.id=a.currency
         ORDER BY w.name, a.id",
    )?;
    let mut rows = stmt.query([])?;
    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let decimals: i64 = r.get(3)?;
        let balance: i64 = r.get(4)?;
        data.push(AccountRow {
            id: r.get(0)?,
            wallet: r.get(1)?,
            currency: r.get(2)?,
            balance: fmt_minor_units(balance, u32::try_from(decimals).unwrap_or(0)),
            balance_minor: balance,
        });
    }
    Ok(data)
}
