//! Phase 5: REMOVING (full-sync mode)
//!
//! Delete remote catalog artists that no longer exist locally. The ledger
//! is not touched here: these artists are already absent from it.

use super::{partition, Shared, SyncOrchestrator};
use crate::services::{CatalogArtist, CatalogService};
use futures::stream::{FuturesUnordered, StreamExt};
use msync_common::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

impl SyncOrchestrator {
    pub(super) async fn phase_removing(
        &self,
        shared: &Shared,
        removals: Vec<CatalogArtist>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let total = removals.len();
        tracing::info!(
            pending = total,
            "removing artists that left the library from the remote catalog"
        );
        shared.lock().await.stats.begin_phase(total);

        let mut workers = FuturesUnordered::new();
        for slice in partition(&removals, self.options.upload_workers) {
            let shared = Arc::clone(shared);
            let catalog = Arc::clone(&self.catalog);
            let cancel = cancel.clone();
            workers.push(tokio::spawn(async move {
                remove_slice(slice, shared, catalog, cancel).await;
            }));
        }
        while let Some(joined) = workers.next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "removal worker panicked");
            }
        }
        Ok(())
    }
}

async fn remove_slice(
    slice: Vec<CatalogArtist>,
    shared: Shared,
    catalog: Arc<dyn CatalogService>,
    cancel: CancellationToken,
) {
    for artist in slice {
        if cancel.is_cancelled() {
            return;
        }

        let result = catalog.delete_artist(&artist.mbid).await;

        let mut guard = shared.lock().await;
        match result {
            Ok(()) => guard.stats.deleted += 1,
            Err(e) => {
                guard.stats.errors += 1;
                tracing::warn!(artist = artist.name.as_str(), error = %e, "removal failed");
            }
        }
        let (done, total) = guard.stats.finish_one();
        drop(guard);
        tracing::info!("[ {} / {} ] {}", done, total, artist.name);
    }
}
