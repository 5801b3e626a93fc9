//! msync library interface
//!
//! Synchronizes the artists of an MPD music library with a MuSpy
//! release-tracking account:
//! - [`ledger`] - persistent artist ledger and diff/merge
//! - [`services`] - collaborator clients (MPD, MusicBrainz, MuSpy),
//!   identifier resolution, and the sync orchestrator

pub mod ledger;
pub mod services;

pub use ledger::{ArtistEntry, ArtistLedger, ArtistRecord};
pub use services::sync_orchestrator::{SyncOrchestrator, SyncState, SyncSummary};
