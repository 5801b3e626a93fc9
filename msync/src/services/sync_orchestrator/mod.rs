//! Sync orchestrator
//!
//! Drives one synchronization pass as a state machine:
//!
//! MERGING → RESOLVING → RECONCILING → UPLOADING → REMOVING → DONE
//!
//! States run sequentially; each is handled by a dedicated `phase_*`
//! module and uses its own worker pool internally. Work is partitioned up
//! front into one contiguous slice per worker; there is no work stealing.
//!
//! The ledger, the error counter, and the progress counter live behind a
//! single mutex. Workers hold the lock for the full mutate+save
//! transaction so the on-disk document always matches a consistent
//! in-memory state, and they perform every network call outside the lock.

use crate::ledger::ArtistLedger;
use crate::services::{CatalogService, IdentifierSearch, MusicSource};
use msync_common::config::SyncConfig;
use msync_common::{Error, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

mod phase_merging;
mod phase_reconciling;
mod phase_removing;
mod phase_resolving;
mod phase_uploading;
mod statistics;

pub use statistics::SyncSummary;
use statistics::SyncStats;

/// The orchestrator's state progression for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Merging,
    Resolving,
    Reconciling,
    Uploading,
    Removing,
    Done,
}

/// Everything the phase workers share under the one lock
struct SyncShared {
    ledger: ArtistLedger,
    stats: SyncStats,
}

impl SyncShared {
    /// Best-effort persistence: failures are reported and the run goes on
    /// with in-memory state.
    fn save_ledger(&self) {
        if let Err(e) = self.ledger.save() {
            tracing::warn!(error = %e, "ledger save failed, continuing with in-memory state");
        }
    }
}

type Shared = Arc<Mutex<SyncShared>>;

/// Partition items into exactly `slices` contiguous slices, sized up
/// front. Tail slices are empty when the batch is smaller than the worker
/// count.
fn partition<T: Clone>(items: &[T], slices: usize) -> Vec<Vec<T>> {
    let slices = slices.max(1);
    let chunk = ((items.len() + slices - 1) / slices).max(1);
    let mut out: Vec<Vec<T>> = items.chunks(chunk).map(<[T]>::to_vec).collect();
    while out.len() < slices {
        out.push(Vec::new());
    }
    out
}

/// Coordinates one sync pass across the collaborators
pub struct SyncOrchestrator {
    options: SyncConfig,
    source: Arc<dyn MusicSource>,
    search: Arc<dyn IdentifierSearch>,
    catalog: Arc<dyn CatalogService>,
}

impl SyncOrchestrator {
    pub fn new(
        options: SyncConfig,
        source: Arc<dyn MusicSource>,
        search: Arc<dyn IdentifierSearch>,
        catalog: Arc<dyn CatalogService>,
    ) -> Self {
        Self {
            options,
            source,
            search,
            catalog,
        }
    }

    /// Run a full synchronization pass over `ledger`.
    ///
    /// Per-artist failures are counted and never abort the pass. A
    /// cancellation stops the active phase's workers at the next artist
    /// boundary; the ledger's last committed state is already on disk and
    /// the run ends with `Error::Interrupted` after a final save.
    pub async fn run(
        &self,
        ledger: ArtistLedger,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary> {
        let shared: Shared = Arc::new(Mutex::new(SyncShared {
            ledger,
            stats: SyncStats::default(),
        }));

        self.transition(SyncState::Merging);
        self.phase_merging(&shared).await?;
        self.checkpoint(&shared, cancel).await?;

        self.transition(SyncState::Resolving);
        let snapshot = Arc::new(self.catalog.list_artists().await?);
        self.phase_resolving(&shared, Arc::clone(&snapshot), cancel)
            .await?;
        self.checkpoint(&shared, cancel).await?;

        self.transition(SyncState::Reconciling);
        let removals = self.phase_reconciling(&shared, &snapshot).await?;

        self.transition(SyncState::Uploading);
        self.phase_uploading(&shared, cancel).await?;
        self.checkpoint(&shared, cancel).await?;

        if self.options.full_sync && !removals.is_empty() {
            self.transition(SyncState::Removing);
            self.phase_removing(&shared, removals, cancel).await?;
            self.checkpoint(&shared, cancel).await?;
        }

        self.transition(SyncState::Done);
        let guard = shared.lock().await;
        guard.save_ledger();
        let summary = guard.stats.summary();
        tracing::info!(
            updated = summary.updated(),
            errors = summary.errors,
            "{}",
            summary
        );
        Ok(summary)
    }

    fn transition(&self, state: SyncState) {
        tracing::info!(state = ?state, "sync state");
    }

    /// Between phases: on cancellation, persist what is committed and stop
    async fn checkpoint(&self, shared: &Shared, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            shared.lock().await.save_ledger();
            return Err(Error::Interrupted);
        }
        Ok(())
    }
}
