// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::accounts::currency_decimals;
use super::arg;
use crate::store::Store;
use crate::store::ledger::{NewLine, NewTransaction};
use crate::utils::{
    fmt_minor_units, fmt_timestamp, maybe_print_json, parse_minor_units, parse_timestamp,
    pretty_table,
};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;

pub fn handle(store: &mut Store, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(store, sub)?,
        Some(("list", sub)) => list(store.conn(), sub)?,
        _ => {}
    }
    Ok(())
}

fn add(store: &mut Store, sub: &clap::ArgMatches) -> Result<()> {
    let account_id = *arg::<i64>(sub, "account")?;
    let tag = *arg::<i64>(sub, "tag")?;
    let counterparty = sub.get_one::<i64>("counterparty").copied();
    let note = sub.get_one::<String>("note").map(|s| s.to_string());
    let timestamp = match sub.get_one::<String>("at") {
        Some(at) => parse_timestamp(at)?,
        None => store.now(),
    };

    let currency: i64 = store
        .conn()
        .query_row(
            "SELECT currency FROM accounts WHERE id=?1",
            params![account_id],
            |r| r.get(0),
        )
        .with_context(|| format!("Account {} not found", account_id))?;
    let decimals = currency_decimals(store.conn(), currency)?;
    let amount = parse_minor_units(arg::<String>(sub, "amount")?, decimals)?;

    let trx = store.record_transaction(NewTransaction {
        timestamp,
        counterparty,
        note,
        lines: vec![NewLine::signed(account_id, tag, amount)],
    })?;
    println!(
        "Recorded {} on {} (acct: {}, tx: {})",
        fmt_minor_units(amount, decimals),
        fmt_timestamp(timestamp),
        account_id,
        trx.id
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.time.clone(),
                    r.id.clone(),
                    r.account.to_string(),
                    r.amount.clone(),
                    r.currency.clone(),
                    r.tag.clone(),
                    r.counterparty.clone(),
                    r.note.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Time", "Tx", "Account", "Amount", "CCY", "Tag", "Counterparty", "Note"],
                rows,
            )
        );
    }
    Ok(())
}

/// One line of a transaction, flattened for display.
#[derive(Serialize)]
pub struct TransactionRow {
    pub id: String,
    pub time: String,
    pub account: i64,
    pub amount: String,
    pub currency: String,
    pub tag: String,
    pub counterparty: String,
    pub note: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT hex(t.id), t.timestamp, b.account, b.sign, b.amount, c.code, c.decimal_places,
                g.name, p.name, n.note
         FROM trx_base b
         JOIN trx t ON t.id=b.trx
         JOIN accounts a ON a.id=b.account
         JOIN currencies c ON c.id=a.currency
         LEFT JOIN tags g ON g.id=b.tag
         LEFT JOIN counterparties p ON p.id=t.counterparty
         LEFT JOIN trx_notes n ON n.trx=t.id
         WHERE 1=1",
    );
    let mut params_vec: Vec<i64> = Vec::new();

    if let Some(acct) = sub.get_one::<i64>("account") {
        sql.push_str(" AND b.account=?");
        params_vec.push(*acct);
    }
    sql.push_str(" ORDER BY t.timestamp DESC, t.id, b.id");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(i64::try_from(*limit).unwrap_or(i64::MAX));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let sign: String = r.get(3)?;
        let amount: i64 = r.get(4)?;
        let signed = if sign == "-" { -amount } else { amount };
        let decimals: i64 = r.get(6)?;
        let tag: Option<String> = r.get(7)?;
        let counterparty: Option<String> = r.get(8)?;
        let note: Option<String> = r.get(9)?;
        data.push(TransactionRow {
            id: r.get(0)?,
            time: fmt_timestamp(r.get(1)?),
            account: r.get(2)?,
            amount: fmt_minor_units(signed, u32::try_from(decimals).unwrap_or(0)),
            currency: r.get(5)?,
            tag: tag.unwrap_or_default(),
            counterparty: counterparty.unwrap_or_default(),
            note: note.unwrap_or_default(),
        });
    }
    Ok(data)
}
