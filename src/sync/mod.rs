// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Package-based device sync: export since a watermark, merge with
//! last-write-wins, propagate deletions through tombstones.

pub mod export;
pub mod import;
pub mod package;
pub mod push;
pub mod state;

pub use export::Exporter;
pub use import::Importer;
pub use package::{ImportCounts, ImportReport, PROTOCOL_VERSION, SyncPackage};
pub use push::{PreparedPush, prepare_push};
pub use state::SyncStateRepository;

/// Whether an incoming row stamped `remote` replaces the local copy.
///
/// Rule:
/// 1. no local row: always apply
/// 2. strictly newer remote `updated_at` wins
/// 3. equal stamps mean the row is already applied (a boundary re-export)
pub fn should_apply_lww(local_updated_at: Option<i64>, remote_updated_at: i64) -> bool {
    match local_updated_at {
        None => true,
        Some(local) => remote_updated_at > local,
    }
}

/// Delete-vs-modify: a tombstone removes the row unless the row was edited
/// after the deletion. Ties go to the deletion.
pub fn deletion_wins(local_updated_at: i64, deleted_at: i64) -> bool {
    deleted_at >= local_updated_at
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lww_applies_new_and_strictly_newer_rows() {
        assert!(should_apply_lww(None, 0));
        assert!(should_apply_lww(Some(100), 101));
        assert!(!should_apply_lww(Some(100), 100));
        assert!(!should_apply_lww(Some(100), 99));
    }

    #[test]
    fn deletion_wins_ties() {
        assert!(deletion_wins(100, 100));
        assert!(deletion_wins(100, 150));
        assert!(!deletion_wins(100, 99));
    }
}
