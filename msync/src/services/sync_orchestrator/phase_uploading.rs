//! Phase 4: UPLOADING
//!
//! Push every not-yet-uploaded record to the remote catalog. The catalog
//! call happens outside the lock; on success the record is marked and the
//! ledger saved in one critical section, so a crash never leaves an
//! uploaded artist unmarked on disk. Records still lacking an id are
//! counted as errors and skipped for this run.

use super::{partition, Shared, SyncOrchestrator};
use crate::ledger::ArtistEntry;
use crate::services::CatalogService;
use futures::stream::{FuturesUnordered, StreamExt};
use msync_common::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

impl SyncOrchestrator {
    pub(super) async fn phase_uploading(
        &self,
        shared: &Shared,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let pending = { shared.lock().await.ledger.artists(Some(false)) };
        let total = pending.len();
        tracing::info!(pending = total, "uploading artists to the remote catalog");
        if total == 0 {
            return Ok(());
        }
        shared.lock().await.stats.begin_phase(total);

        let mut workers = FuturesUnordered::new();
        for slice in partition(&pending, self.options.upload_workers) {
            let shared = Arc::clone(shared);
            let catalog = Arc::clone(&self.catalog);
            let cancel = cancel.clone();
            workers.push(tokio::spawn(async move {
                upload_slice(slice, shared, catalog, cancel).await;
            }));
        }
        while let Some(joined) = workers.next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "upload worker panicked");
            }
        }
        Ok(())
    }
}

async fn upload_slice(
    slice: Vec<ArtistEntry>,
    shared: Shared,
    catalog: Arc<dyn CatalogService>,
    cancel: CancellationToken,
) {
    for entry in slice {
        if cancel.is_cancelled() {
            return;
        }

        let result = match entry.mbid.as_deref() {
            Some(mbid) => catalog.put_artist(mbid).await.map(Some),
            None => Ok(None),
        };

        let mut guard = shared.lock().await;
        match result {
            Ok(Some(())) => match guard.ledger.mark_uploaded(&entry.name) {
                Ok(()) => {
                    guard.save_ledger();
                    guard.stats.uploaded += 1;
                }
                Err(e) => {
                    guard.stats.errors += 1;
                    tracing::warn!(artist = entry.name.as_str(), error = %e, "cannot mark uploaded");
                }
            },
            Ok(None) => {
                guard.stats.errors += 1;
                tracing::warn!(
                    artist = entry.name.as_str(),
                    "no musicbrainz id, upload skipped"
                );
            }
            Err(e) => {
                guard.stats.errors += 1;
                tracing::warn!(artist = entry.name.as_str(), error = %e, "upload failed");
            }
        }
        let (done, total) = guard.stats.finish_one();
        drop(guard);
        tracing::info!("[ {} / {} ] {}", done, total, entry.name);
    }
}
