//! Phase 2: RESOLVING
//!
//! Resolve a MusicBrainz id for every ledger record that lacks one.
//! Workers take statically partitioned slices; each resolved id is
//! persisted immediately (write-through) so partial progress survives a
//! crash. The worker count stays small to respect the MusicBrainz rate
//! limit.

use super::{partition, Shared, SyncOrchestrator};
use crate::services::resolver::MbidResolver;
use crate::services::{CatalogArtist, IdentifierSearch, MusicSource};
use futures::stream::{FuturesUnordered, StreamExt};
use msync_common::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

impl SyncOrchestrator {
    pub(super) async fn phase_resolving(
        &self,
        shared: &Shared,
        snapshot: Arc<Vec<CatalogArtist>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let pending: Vec<String> = {
            let guard = shared.lock().await;
            guard
                .ledger
                .artists(None)
                .into_iter()
                .filter(|entry| entry.mbid.is_none())
                .map(|entry| entry.name)
                .collect()
        };
        let total = pending.len();
        tracing::info!(missing = total, "resolving musicbrainz ids");
        if total == 0 {
            return Ok(());
        }
        shared.lock().await.stats.begin_phase(total);

        let mut workers = FuturesUnordered::new();
        for slice in partition(&pending, self.options.resolve_workers) {
            let shared = Arc::clone(shared);
            let source = Arc::clone(&self.source);
            let search = Arc::clone(&self.search);
            let snapshot = Arc::clone(&snapshot);
            let cancel = cancel.clone();
            workers.push(tokio::spawn(async move {
                resolve_slice(slice, shared, source, search, snapshot, cancel).await;
            }));
        }
        while let Some(joined) = workers.next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "resolve worker panicked");
            }
        }
        Ok(())
    }
}

async fn resolve_slice(
    slice: Vec<String>,
    shared: Shared,
    source: Arc<dyn MusicSource>,
    search: Arc<dyn IdentifierSearch>,
    snapshot: Arc<Vec<CatalogArtist>>,
    cancel: CancellationToken,
) {
    let resolver = MbidResolver::new(search.as_ref(), source.as_ref());
    for name in slice {
        if cancel.is_cancelled() {
            return;
        }

        // The remote catalog snapshot already carries ids for artists it
        // follows; checking it is free, searching is rate-limited.
        let from_snapshot = snapshot
            .iter()
            .find(|artist| artist.name.to_lowercase() == name)
            .map(|artist| artist.mbid.clone());
        let outcome = match from_snapshot {
            Some(mbid) => Ok(mbid),
            None => resolver.resolve(&name).await,
        };

        let mut guard = shared.lock().await;
        match outcome {
            Ok(mbid) => match guard.ledger.set_mbid(&name, mbid) {
                Ok(()) => {
                    guard.save_ledger();
                    guard.stats.resolved += 1;
                }
                Err(e) => {
                    guard.stats.errors += 1;
                    tracing::warn!(artist = name.as_str(), error = %e, "cannot record resolved id");
                }
            },
            Err(e) => {
                guard.stats.errors += 1;
                tracing::warn!(artist = name.as_str(), error = %e, "identifier resolution failed");
            }
        }
        let (done, total) = guard.stats.finish_one();
        drop(guard);
        tracing::info!("[ {} / {} ] {}", done, total, name);
    }
}
