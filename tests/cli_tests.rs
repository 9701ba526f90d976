// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use pocketledger::cli::build_cli;
use pocketledger::commands::{self, accounts};
use pocketledger::store::Store;
use pocketledger::sync::{SyncPackage, SyncStateRepository};

fn run(store: &mut Store, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["pocketledger"];
    argv.extend_from_slice(args);
    let matches = build_cli().try_get_matches_from(argv)?;
    assert!(commands::dispatch(store, &matches)?);
    Ok(())
}

#[test]
fn parses_signed_amounts_and_defaults() {
    let m = build_cli()
        .try_get_matches_from(["pocketledger", "tx", "add", "--account", "1", "--amount", "-12.50"])
        .unwrap();
    let (_, tx) = m.subcommand().unwrap();
    let (_, add) = tx.subcommand().unwrap();
    assert_eq!(add.get_one::<String>("amount").unwrap(), "-12.50");
    assert_eq!(*add.get_one::<i64>("tag").unwrap(), 10);

    let m = build_cli()
        .try_get_matches_from(["pocketledger", "sync", "export", "--out", "pkg.json"])
        .unwrap();
    let (_, sync) = m.subcommand().unwrap();
    let (_, export) = sync.subcommand().unwrap();
    assert_eq!(export.get_one::<String>("since").unwrap(), "0");

    assert!(
        build_cli()
            .try_get_matches_from(["pocketledger", "account", "list", "--json", "--jsonl"])
            .is_err()
    );
}

#[test]
fn two_devices_sync_through_package_files() {
    let dir = tempfile::tempdir().unwrap();
    let pkg_path = dir.path().join("a-to-b.json");
    let pkg = pkg_path.to_str().unwrap();

    let mut a = Store::open(dir.path().join("a.sqlite")).unwrap();
    run(&mut a, &["currency", "add", "--code", "usd", "--name", "US Dollar", "--symbol", "$"]).unwrap();
    run(&mut a, &["wallet", "add", "--name", "Everyday"]).unwrap();
    run(&mut a, &["account", "add", "--wallet", "1", "--currency", "1", "--initial", "250.00"]).unwrap();
    run(&mut a, &["tag", "add", "--name", "Coffee", "--parent", "2"]).unwrap();
    run(&mut a, &["tx", "add", "--account", "1", "--amount", "-4.75", "--tag", "23", "--note", "flat white"]).unwrap();
    run(&mut a, &["counterparty", "add", "--name", "Cafe"]).unwrap();
    run(&mut a, &["budget", "add", "--tag", "23", "--amount", "5000", "--start", "2025-01-01", "--end", "2025-02-01"]).unwrap();
    run(&mut a, &["tx", "list", "--json"]).unwrap();
    run(&mut a, &["sync", "export", "--out", pkg, "--sender", "device-a"]).unwrap();

    let written = SyncPackage::read_from(&pkg_path).unwrap();
    assert_eq!(written.sender_id, "device-a");
    assert_eq!(written.transactions.len(), 2);
    assert_eq!(written.budgets.len(), 1);

    let mut b = Store::open(dir.path().join("b.sqlite")).unwrap();
    run(&mut b, &["sync", "import", "--path", pkg]).unwrap();
    let rows = accounts::query_rows(b.conn()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].balance, "245.25");
    assert_eq!(rows[0].balance_minor, 24_525);

    let state = SyncStateRepository::new(&b).get("device-a").unwrap().unwrap();
    assert_eq!(state.last_sync_at, written.created_at);
    run(&mut b, &["sync", "state", "--jsonl"]).unwrap();
    run(&mut b, &["doctor"]).unwrap();
}

#[test]
fn push_records_the_watermark_and_rm_tombstones() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("push.json");
    let mut a = Store::open(dir.path().join("a.sqlite")).unwrap();
    run(&mut a, &["wallet", "add", "--name", "Spare"]).unwrap();
    run(&mut a, &["rm", "wallet", "1"]).unwrap();
    run(&mut a, &["sync", "push", "--to", "device-b", "--out", out.to_str().unwrap()]).unwrap();

    let pushed = SyncPackage::read_from(&out).unwrap();
    assert_eq!(pushed.since, 0);
    assert_eq!(pushed.deletions.len(), 1);
    assert_eq!(pushed.sender_id, a.installation_id().unwrap());
    let state = SyncStateRepository::new(&a).get("device-b").unwrap().unwrap();
    assert!(state.last_push_at > 0);

    assert!(run(&mut a, &["rm", "gizmo", "1"]).is_err());
    assert!(run(&mut a, &["rm", "tag", "4"]).is_err());
}

#[test]
fn import_failures_surface_as_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.json");
    std::fs::write(
        &path,
        r#"{"version": 9, "sender_id": "x", "created_at": 1, "since": 0}"#,
    )
    .unwrap();
    let mut b = Store::open(dir.path().join("b.sqlite")).unwrap();
    let err = run(&mut b, &["sync", "import", "--path", path.to_str().unwrap()]).unwrap_err();
    assert!(err.to_string().contains("rolled back"));
    assert_eq!(SyncStateRepository::new(&b).get("x").unwrap(), None);
}
