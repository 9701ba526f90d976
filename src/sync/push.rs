// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use tracing::info;

use super::export::Exporter;
use super::package::SyncPackage;
use super::state::SyncStateRepository;
use crate::error::Result;
use crate::store::Store;

/// A package bound for one remote, together with the watermark to record
/// once the remote has accepted it.
#[derive(Debug, Clone)]
pub struct PreparedPush {
    pub installation_id: String,
    pub watermark: i64,
    pub package: SyncPackage,
}

/// Exports everything since the remote's `last_push_at`. The new watermark is
/// read from the clock before the export starts.
pub fn prepare_push(store: &Store, installation_id: &str, sender_id: &str) -> Result<PreparedPush> {
    let repo = SyncStateRepository::new(store);
    repo.ensure(installation_id)?;
    let since = repo.get(installation_id)?.map_or(0, |s| s.last_push_at);
    let watermark = store.now();
    let package = Exporter::new(store).export(since, sender_id)?;
    Ok(PreparedPush {
        installation_id: installation_id.to_string(),
        watermark,
        package,
    })
}

impl PreparedPush {
    pub fn acknowledge(&self, repo: &SyncStateRepository<'_>) -> Result<()> {
        repo.update_push_timestamp(&self.installation_id, self.watermark)?;
        info!(
            installation_id = %self.installation_id,
            watermark = self.watermark,
            "push acknowledged"
        );
        Ok(())
    }
}
