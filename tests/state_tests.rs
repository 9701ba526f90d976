// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use pocketledger::models::SyncState;
use pocketledger::store::Store;
use pocketledger::sync::SyncStateRepository;

#[test]
fn ensure_creates_zeroed_rows_once() {
    let store = Store::open_in_memory().unwrap();
    let repo = SyncStateRepository::new(&store);
    assert_eq!(repo.get("laptop").unwrap(), None);

    repo.ensure("laptop").unwrap();
    assert_eq!(
        repo.get("laptop").unwrap(),
        Some(SyncState {
            last_push_at: 0,
            last_sync_at: 0
        })
    );

    repo.update_push_timestamp("laptop", 1_234).unwrap();
    repo.ensure("laptop").unwrap();
    assert_eq!(repo.get("laptop").unwrap().unwrap().last_push_at, 1_234);
}

#[test]
fn push_and_sync_watermarks_are_independent() {
    let store = Store::open_in_memory().unwrap();
    let repo = SyncStateRepository::new(&store);

    repo.update_push_timestamp("phone", 500).unwrap();
    repo.update_sync_timestamp("phone", 700).unwrap();
    repo.update_push_timestamp("phone", 450).unwrap();

    let state = repo.get("phone").unwrap().unwrap();
    assert_eq!(state.last_push_at, 450);
    assert_eq!(state.last_sync_at, 700);

    repo.update_sync_timestamp("tablet", 10).unwrap();
    let all = repo.list().unwrap();
    assert_eq!(
        all.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>(),
        vec!["phone", "tablet"]
    );
    assert_eq!(all[1].1.last_push_at, 0);
}
