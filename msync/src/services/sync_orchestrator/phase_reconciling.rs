//! Phase 3: RECONCILING
//!
//! Align the ledger's uploaded flags with the remote catalog snapshot:
//! records whose id is followed remotely become uploaded, records whose id
//! is not become not-uploaded. In full-sync mode this phase also computes
//! the remote-only artists pending removal.

use super::{Shared, SyncOrchestrator};
use crate::services::CatalogArtist;
use msync_common::Result;
use std::collections::HashSet;

impl SyncOrchestrator {
    pub(super) async fn phase_reconciling(
        &self,
        shared: &Shared,
        snapshot: &[CatalogArtist],
    ) -> Result<Vec<CatalogArtist>> {
        let remote_ids: HashSet<&str> =
            snapshot.iter().map(|artist| artist.mbid.as_str()).collect();

        let mut guard = shared.lock().await;
        let mut flipped = 0usize;
        for entry in guard.ledger.artists(None) {
            let Some(mbid) = entry.mbid else { continue };
            let present = remote_ids.contains(mbid.as_str());
            if present && !entry.uploaded {
                guard.ledger.mark_uploaded(&entry.name)?;
                flipped += 1;
            } else if !present && entry.uploaded {
                guard.ledger.mark_not_uploaded(&entry.name)?;
                flipped += 1;
            }
        }
        guard.save_ledger();

        let mut removals = Vec::new();
        if self.options.full_sync {
            let local_ids = guard.ledger.resolved_mbids();
            for artist in snapshot {
                let name = artist.name.to_lowercase();
                // only artists unknown locally by both name and id may go;
                // a renamed local artist keeps its remote entry
                if !guard.ledger.contains(&name)
                    && !local_ids.contains(&artist.mbid)
                    && !guard.ledger.is_ignored(&name)
                {
                    removals.push(artist.clone());
                }
            }
        }

        tracing::info!(
            flipped,
            pending_removals = removals.len(),
            "reconciled ledger against the remote catalog"
        );
        Ok(removals)
    }
}
