//! Run statistics
//!
//! Counters shared by the phase workers (under the orchestrator's lock)
//! and the summary reported when a pass completes.

use std::fmt;

/// Mutable counters for the pass in progress.
///
/// `phase_done`/`phase_total` drive the per-artist progress lines and are
/// reset at the start of each parallel phase; the other counters
/// accumulate across the whole run.
#[derive(Debug, Clone, Default)]
pub(super) struct SyncStats {
    pub(super) added: usize,
    pub(super) removed: usize,
    pub(super) resolved: usize,
    pub(super) uploaded: usize,
    pub(super) deleted: usize,
    pub(super) errors: usize,
    phase_done: usize,
    phase_total: usize,
}

impl SyncStats {
    pub(super) fn begin_phase(&mut self, total: usize) {
        self.phase_done = 0;
        self.phase_total = total;
    }

    /// Count one artist as processed in the current phase; returns
    /// `(done, total)` for the progress line.
    pub(super) fn finish_one(&mut self) -> (usize, usize) {
        self.phase_done += 1;
        (self.phase_done, self.phase_total)
    }

    pub(super) fn summary(&self) -> SyncSummary {
        SyncSummary {
            added: self.added,
            removed: self.removed,
            resolved: self.resolved,
            uploaded: self.uploaded,
            deleted: self.deleted,
            errors: self.errors,
        }
    }
}

/// Final outcome of one synchronization pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    /// Artists added to the ledger by the merge
    pub added: usize,
    /// Artists removed from the ledger by the merge
    pub removed: usize,
    /// Identifiers resolved this pass
    pub resolved: usize,
    /// Artists successfully uploaded to the remote catalog
    pub uploaded: usize,
    /// Artists deleted from the remote catalog (full-sync mode)
    pub deleted: usize,
    /// Per-artist failures across all phases
    pub errors: usize,
}

impl SyncSummary {
    /// Artists whose remote state changed this pass
    pub fn updated(&self) -> usize {
        self.uploaded + self.deleted
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "done: {} artist(s) added, {} removed, {} updated on the remote catalog",
            self.added,
            self.removed,
            self.updated()
        )?;
        if self.errors > 0 {
            write!(f, " with {} error(s)", self.errors)?;
        }
        Ok(())
    }
}
