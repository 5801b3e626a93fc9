//! Phase 1: MERGING
//!
//! Pull the observed artist set from the music source, merge it into the
//! ledger, and persist the merged snapshot.

use super::{Shared, SyncOrchestrator};
use msync_common::Result;

impl SyncOrchestrator {
    pub(super) async fn phase_merging(&self, shared: &Shared) -> Result<()> {
        tracing::info!("fetching artists from the music source");
        let observed = self.source.list_artists().await?;

        let mut guard = shared.lock().await;
        let (added, removed) = guard.ledger.merge(&observed);
        guard.stats.added = added.len();
        guard.stats.removed = removed.len();
        guard.save_ledger();
        tracing::info!(
            observed = observed.len(),
            added = added.len(),
            removed = removed.len(),
            "library merged into ledger"
        );
        Ok(())
    }
}
