// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use pocketledger::LedgerError;
use pocketledger::commands::doctor;
use pocketledger::db::INITIAL_BALANCE_TAG;
use pocketledger::models::{EntityId, EntityKind, Sign};
use pocketledger::store::ledger::{NewLine, NewTransaction};
use pocketledger::store::{ManualClock, Store};
use pocketledger::sync::Exporter;
use rust_decimal::Decimal;

fn setup() -> (Store, ManualClock, i64) {
    let clock = ManualClock::new(1_000);
    let mut store = Store::open_in_memory().unwrap().with_clock(clock.clone());
    let usd = store.add_currency("USD", "US Dollar", "$", 2).unwrap();
    let wallet = store.add_wallet("Main", 0, &[]).unwrap();
    let account = store.add_account(wallet.id, usd.id, &[]).unwrap();
    (store, clock, account.id)
}

fn balance(store: &Store, account: i64) -> i64 {
    store.account(account).unwrap().unwrap().balance
}

#[test]
fn balances_track_recorded_and_replaced_lines() {
    let (mut store, _, cash) = setup();
    let usd: i64 = store
        .conn()
        .query_row("SELECT id FROM currencies", [], |r| r.get(0))
        .unwrap();
    let savings = store.add_account(1, usd, &[]).unwrap().id;

    store
        .record_transaction(NewTransaction {
            timestamp: 1_000,
            lines: vec![NewLine::signed(cash, INITIAL_BALANCE_TAG, 20_000)],
            ..NewTransaction::default()
        })
        .unwrap();
    let transfer = store
        .record_transaction(NewTransaction {
            timestamp: 1_000,
            note: Some("to savings".into()),
            lines: vec![
                NewLine::signed(cash, 3, -5_000),
                NewLine::signed(savings, 3, 5_000),
            ],
            ..NewTransaction::default()
        })
        .unwrap();
    assert_eq!(balance(&store, cash), 15_000);
    assert_eq!(balance(&store, savings), 5_000);
    assert_eq!(transfer.lines[0].sign, Sign::Minus);
    assert_eq!(transfer.lines[0].amount, 5_000);

    store
        .replace_transaction_lines(transfer.id, vec![NewLine::signed(cash, 2, -700)])
        .unwrap();
    assert_eq!(balance(&store, cash), 19_300);
    assert_eq!(balance(&store, savings), 0);

    store
        .delete(EntityKind::Transaction, transfer.id.into())
        .unwrap();
    assert_eq!(balance(&store, cash), 20_000);
    assert!(store.transaction(&transfer.id).unwrap().is_none());
    let notes: i64 = store
        .conn()
        .query_row("SELECT COUNT(*) FROM trx_notes", [], |r| r.get(0))
        .unwrap();
    assert_eq!(notes, 0);
}

#[test]
fn transactions_need_at_least_one_line() {
    let (mut store, _, _) = setup();
    let err = store
        .record_transaction(NewTransaction {
            timestamp: 1_000,
            ..NewTransaction::default()
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::Invalid(_)));
}

#[test]
fn lines_keep_their_rate() {
    let (mut store, _, cash) = setup();
    let trx = store
        .record_transaction(NewTransaction {
            timestamp: 1_000,
            lines: vec![NewLine {
                rate: Decimal::new(915, 3),
                ..NewLine::signed(cash, 8, 1_000)
            }],
            ..NewTransaction::default()
        })
        .unwrap();
    let loaded = store.transaction(&trx.id).unwrap().unwrap();
    assert_eq!(loaded.lines[0].rate, Decimal::new(915, 3));
}

#[test]
fn referenced_rows_cannot_be_deleted() {
    let (mut store, _, cash) = setup();
    let dining = store.add_tag("Dining", &[2], None).unwrap();
    store
        .record_transaction(NewTransaction {
            timestamp: 1_000,
            lines: vec![NewLine::signed(cash, dining.id, -1_200)],
            ..NewTransaction::default()
        })
        .unwrap();

    let err = store.delete(EntityKind::Account, cash.into()).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::ReferentialIntegrity {
            kind: EntityKind::Account,
            ..
        }
    ));
    assert!(matches!(
        store.delete(EntityKind::Tag, dining.id.into()),
        Err(LedgerError::ReferentialIntegrity { .. })
    ));
    assert!(matches!(
        store.delete(EntityKind::Currency, EntityId::Small(1)),
        Err(LedgerError::ReferentialIntegrity { .. })
    ));
    assert!(matches!(
        store.delete(EntityKind::Wallet, EntityId::Small(1)),
        Err(LedgerError::ReferentialIntegrity { .. })
    ));
    let missing = EntityId::parse(EntityKind::Budget, "00000000000000AA").unwrap();
    assert!(matches!(
        store.delete(EntityKind::Budget, missing),
        Err(LedgerError::NotFound { .. })
    ));
}

#[test]
fn tags_used_by_budgets_stay() {
    let (mut store, _, _) = setup();
    let rent = store.add_tag("Rent", &[2], None).unwrap();
    let budget = store.add_budget(rent.id, 150_000, 0, 2_592_000).unwrap();
    assert!(budget.covers(0));
    assert!(!budget.covers(2_592_000));
    assert!(store.delete(EntityKind::Tag, rent.id.into()).is_err());
    store.delete(EntityKind::Budget, budget.id.into()).unwrap();
    store.delete(EntityKind::Tag, rent.id.into()).unwrap();
    assert!(store.add_budget(rent.id, 1, 10, 10).is_err());
}

#[test]
fn deleting_a_wallet_tombstones_its_accounts() {
    let (mut store, clock, cash) = setup();
    clock.advance(500);
    store.delete(EntityKind::Wallet, EntityId::Small(1)).unwrap();
    assert!(store.account(cash).unwrap().is_none());

    let pkg = Exporter::new(&store).export(1_500, "me").unwrap();
    let mut deleted: Vec<(String, String)> = pkg
        .deletions
        .iter()
        .map(|t| (String::from(t.entity.clone()), t.entity_id.clone()))
        .collect();
    deleted.sort();
    assert_eq!(
        deleted,
        vec![
            ("account".to_string(), cash.to_string()),
            ("wallet".to_string(), "1".to_string())
        ]
    );
}

#[test]
fn linking_tags_rejects_cycles_and_restamps_both_ends() {
    let (mut store, clock, _) = setup();
    let food = store.add_tag("Food", &[], None).unwrap();
    let snacks = store.add_tag("Snacks", &[food.id], None).unwrap();

    assert!(matches!(
        store.link_tags(snacks.id, food.id),
        Err(LedgerError::TagCycle { .. })
    ));
    assert!(store.link_tags(food.id, food.id).is_err());

    clock.set(2_000);
    let treats = store.add_tag("Treats", &[], None).unwrap();
    store.link_tags(treats.id, snacks.id).unwrap();
    let pkg = Exporter::new(&store).export(2_000, "me").unwrap();
    let mut ids: Vec<i64> = pkg.tags.iter().map(|t| t.id).collect();
    ids.sort();
    assert_eq!(ids, vec![snacks.id, treats.id]);
    let exported = pkg.tags.iter().find(|t| t.id == snacks.id).unwrap();
    assert_eq!(exported.parents, vec![food.id, treats.id]);
}

#[test]
fn deleting_an_icon_restamps_tags_that_used_it() {
    let (mut store, clock, _) = setup();
    let icon = store.add_icon("plane").unwrap();
    let travel = store.add_tag("Travel", &[], Some(icon.id)).unwrap();
    clock.set(3_000);
    store.delete(EntityKind::Icon, icon.id.into()).unwrap();

    let pkg = Exporter::new(&store).export(3_000, "me").unwrap();
    assert_eq!(pkg.tags.len(), 1);
    assert_eq!(pkg.tags[0].id, travel.id);
    assert_eq!(pkg.tags[0].icon, None);
}

#[test]
fn doctor_spots_and_fixes_drifted_balances() {
    let (mut store, _, cash) = setup();
    store
        .record_transaction(NewTransaction {
            timestamp: 1_000,
            lines: vec![NewLine::signed(cash, INITIAL_BALANCE_TAG, 900)],
            ..NewTransaction::default()
        })
        .unwrap();
    store
        .conn()
        .execute("UPDATE accounts SET balance=1 WHERE id=?1", [cash])
        .unwrap();

    let issues = doctor::check(store.conn()).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, "balance_mismatch");

    assert_eq!(store.recompute_balances().unwrap(), 1);
    assert!(doctor::check(store.conn()).unwrap().is_empty());
    assert_eq!(balance(&store, cash), 900);
}

#[test]
fn installation_id_is_stable() {
    let (store, _, _) = setup();
    let first = store.installation_id().unwrap();
    assert_eq!(first.len(), 32);
    assert_eq!(store.installation_id().unwrap(), first);
}
