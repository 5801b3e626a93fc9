//! End-to-end sync passes against in-memory collaborators

use async_trait::async_trait;
use msync::ledger::ArtistLedger;
use msync::services::{
    ArtistMatch, CatalogArtist, CatalogService, IdentifierSearch, MusicSource, ReleaseMatch,
};
use msync::SyncOrchestrator;
use msync_common::config::SyncConfig;
use msync_common::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

struct FakeSource {
    artists: HashSet<String>,
}

impl FakeSource {
    fn new(artists: &[&str]) -> Self {
        Self {
            artists: artists.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl MusicSource for FakeSource {
    async fn list_artists(&self) -> Result<HashSet<String>> {
        Ok(self.artists.clone())
    }

    async fn list_albums(&self, _artist: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

struct FakeSearch {
    ids: HashMap<String, String>,
}

impl FakeSearch {
    fn new(ids: &[(&str, &str)]) -> Self {
        Self {
            ids: ids
                .iter()
                .map(|(name, id)| (name.to_string(), id.to_string()))
                .collect(),
        }
    }

    fn empty() -> Self {
        Self {
            ids: HashMap::new(),
        }
    }
}

#[async_trait]
impl IdentifierSearch for FakeSearch {
    async fn search_artists(&self, name: &str, _limit: u32) -> Result<Vec<ArtistMatch>> {
        Ok(self
            .ids
            .get(name)
            .map(|id| {
                vec![ArtistMatch {
                    id: id.clone(),
                    name: name.to_string(),
                }]
            })
            .unwrap_or_default())
    }

    async fn search_releases(&self, _title: &str, _limit: u32) -> Result<Vec<ReleaseMatch>> {
        Ok(Vec::new())
    }
}

struct FakeCatalog {
    remote: Vec<CatalogArtist>,
    fail_puts: bool,
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
}

impl FakeCatalog {
    fn new(remote: &[(&str, &str)]) -> Self {
        Self {
            remote: remote
                .iter()
                .map(|(name, mbid)| CatalogArtist {
                    name: name.to_string(),
                    mbid: mbid.to_string(),
                })
                .collect(),
            fail_puts: false,
            puts: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        }
    }

    fn failing_puts(mut self) -> Self {
        self.fail_puts = true;
        self
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn list_artists(&self) -> Result<Vec<CatalogArtist>> {
        Ok(self.remote.clone())
    }

    async fn put_artist(&self, mbid: &str) -> Result<()> {
        if self.fail_puts {
            return Err(Error::RemoteOperation("add artist returned 500".to_string()));
        }
        self.puts.lock().await.push(mbid.to_string());
        Ok(())
    }

    async fn delete_artist(&self, mbid: &str) -> Result<()> {
        self.deletes.lock().await.push(mbid.to_string());
        Ok(())
    }
}

fn sync_config(full_sync: bool) -> SyncConfig {
    SyncConfig {
        full_sync,
        resolve_workers: 3,
        upload_workers: 5,
        ignore: Vec::new(),
        ledger_path: None,
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    path: PathBuf,
    catalog: Arc<FakeCatalog>,
    orchestrator: SyncOrchestrator,
}

impl Harness {
    fn new(
        options: SyncConfig,
        source: FakeSource,
        search: FakeSearch,
        catalog: FakeCatalog,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artists.json");
        let catalog = Arc::new(catalog);
        let orchestrator = SyncOrchestrator::new(
            options,
            Arc::new(source),
            Arc::new(search),
            Arc::clone(&catalog) as Arc<dyn CatalogService>,
        );
        Self {
            _dir: dir,
            path,
            catalog,
            orchestrator,
        }
    }

    fn ledger(&self, ignore: &[&str]) -> ArtistLedger {
        ArtistLedger::load(&self.path, ignore.iter().map(|s| s.to_lowercase()).collect())
    }

    async fn run(&self, ledger: ArtistLedger) -> Result<msync::SyncSummary> {
        self.orchestrator.run(ledger, &CancellationToken::new()).await
    }
}

#[tokio::test]
async fn test_first_pass_resolves_and_uploads_everything() {
    let harness = Harness::new(
        sync_config(false),
        FakeSource::new(&["alice", "carol"]),
        FakeSearch::new(&[("alice", "id-alice"), ("carol", "id-carol")]),
        FakeCatalog::new(&[]),
    );

    let summary = harness.run(harness.ledger(&[])).await.unwrap();

    assert_eq!(summary.added, 2);
    assert_eq!(summary.removed, 0);
    assert_eq!(summary.resolved, 2);
    assert_eq!(summary.uploaded, 2);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.updated(), 2);

    let mut puts = harness.catalog.puts.lock().await.clone();
    puts.sort();
    assert_eq!(puts, vec!["id-alice", "id-carol"]);

    // the persisted document matches the final in-memory state
    let reloaded = harness.ledger(&[]);
    for entry in reloaded.artists(None) {
        assert!(entry.uploaded, "{} should be uploaded", entry.name);
        assert!(entry.mbid.is_some());
    }
    assert_eq!(reloaded.len(), 2);
}

#[tokio::test]
async fn test_unresolvable_artist_is_counted_and_does_not_abort_the_batch() {
    let harness = Harness::new(
        sync_config(false),
        FakeSource::new(&["alice", "ghost"]),
        FakeSearch::new(&[("alice", "id-alice")]),
        FakeCatalog::new(&[]),
    );

    let summary = harness.run(harness.ledger(&[])).await.unwrap();

    // one failure at resolution, one more when the upload skips the
    // still-unresolved record
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.uploaded, 1);
    assert_eq!(harness.catalog.puts.lock().await.as_slice(), ["id-alice"]);

    let reloaded = harness.ledger(&[]);
    assert!(reloaded.artists(Some(false)).iter().any(|e| e.name == "ghost"));
}

#[tokio::test]
async fn test_reconcile_marks_remote_artists_uploaded_without_reuploading() {
    let harness = Harness::new(
        sync_config(false),
        FakeSource::new(&["bob"]),
        FakeSearch::empty(),
        FakeCatalog::new(&[("Bob", "id-bob")]),
    );

    let mut ledger = harness.ledger(&[]);
    ledger.add_one("bob");
    ledger.set_mbid("bob", "id-bob").unwrap();
    ledger.save().unwrap();

    let summary = harness.run(ledger).await.unwrap();

    assert_eq!(summary.uploaded, 0);
    assert_eq!(summary.errors, 0);
    assert!(harness.catalog.puts.lock().await.is_empty());
    assert!(harness.ledger(&[]).artists(Some(true)).iter().any(|e| e.name == "bob"));
}

#[tokio::test]
async fn test_reconcile_unmarks_artists_that_left_the_remote_catalog() {
    let harness = Harness::new(
        sync_config(false),
        FakeSource::new(&["alice"]),
        FakeSearch::empty(),
        FakeCatalog::new(&[]),
    );

    let mut ledger = harness.ledger(&[]);
    ledger.add_one("alice");
    ledger.set_mbid("alice", "id-alice").unwrap();
    ledger.mark_uploaded("alice").unwrap();
    ledger.save().unwrap();

    let summary = harness.run(ledger).await.unwrap();

    // unmarked during reconcile, re-uploaded right after
    assert_eq!(summary.uploaded, 1);
    assert_eq!(harness.catalog.puts.lock().await.as_slice(), ["id-alice"]);
}

#[tokio::test]
async fn test_full_sync_removes_remote_only_artists() {
    let harness = Harness::new(
        sync_config(true),
        FakeSource::new(&[]),
        FakeSearch::empty(),
        FakeCatalog::new(&[("dave", "id1")]),
    );

    let summary = harness.run(harness.ledger(&[])).await.unwrap();

    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.updated(), 1);
    assert_eq!(harness.catalog.deletes.lock().await.as_slice(), ["id1"]);
}

#[tokio::test]
async fn test_full_sync_never_removes_ignored_artists() {
    let harness = Harness::new(
        sync_config(true),
        FakeSource::new(&[]),
        FakeSearch::empty(),
        FakeCatalog::new(&[("Various Artists", "id-va")]),
    );

    let summary = harness
        .run(harness.ledger(&["Various Artists"]))
        .await
        .unwrap();

    assert_eq!(summary.deleted, 0);
    assert!(harness.catalog.deletes.lock().await.is_empty());
}

#[tokio::test]
async fn test_remote_only_artists_survive_without_full_sync() {
    let harness = Harness::new(
        sync_config(false),
        FakeSource::new(&[]),
        FakeSearch::empty(),
        FakeCatalog::new(&[("dave", "id1")]),
    );

    let summary = harness.run(harness.ledger(&[])).await.unwrap();

    assert_eq!(summary.deleted, 0);
    assert!(harness.catalog.deletes.lock().await.is_empty());
}

#[tokio::test]
async fn test_parallel_uploads_lose_no_updates() {
    let names: Vec<String> = (0..20).map(|i| format!("artist-{:02}", i)).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let ids: Vec<(String, String)> = names
        .iter()
        .map(|name| (name.clone(), format!("id-{}", name)))
        .collect();
    let id_refs: Vec<(&str, &str)> = ids
        .iter()
        .map(|(name, id)| (name.as_str(), id.as_str()))
        .collect();

    let harness = Harness::new(
        sync_config(false),
        FakeSource::new(&name_refs),
        FakeSearch::new(&id_refs),
        FakeCatalog::new(&[]),
    );

    let summary = harness.run(harness.ledger(&[])).await.unwrap();

    assert_eq!(summary.uploaded, 20);
    assert_eq!(summary.errors, 0);

    let puts = harness.catalog.puts.lock().await;
    let unique: HashSet<&String> = puts.iter().collect();
    assert_eq!(unique.len(), 20);

    // exactly the successfully uploaded artists are flagged on disk
    let reloaded = harness.ledger(&[]);
    assert_eq!(reloaded.artists(Some(true)).len(), 20);
    assert_eq!(reloaded.artists(Some(false)).len(), 0);
}

#[tokio::test]
async fn test_snapshot_shortcut_resolves_known_remote_names_without_search() {
    // the search service knows nothing, so any resolution must have come
    // from the remote catalog snapshot
    let harness = Harness::new(
        sync_config(false),
        FakeSource::new(&["dave"]),
        FakeSearch::empty(),
        FakeCatalog::new(&[("Dave", "id-dave")]),
    );

    let summary = harness.run(harness.ledger(&[])).await.unwrap();

    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(harness.ledger(&[]).mbid("dave"), Some("id-dave"));
}

#[tokio::test]
async fn test_failed_upload_leaves_the_record_not_uploaded() {
    let harness = Harness::new(
        sync_config(false),
        FakeSource::new(&["alice"]),
        FakeSearch::new(&[("alice", "id-alice")]),
        FakeCatalog::new(&[]).failing_puts(),
    );

    let summary = harness.run(harness.ledger(&[])).await.unwrap();

    assert_eq!(summary.uploaded, 0);
    assert_eq!(summary.errors, 1);

    let reloaded = harness.ledger(&[]);
    let entry = &reloaded.artists(Some(false))[0];
    assert_eq!(entry.name, "alice");
    assert_eq!(entry.mbid.as_deref(), Some("id-alice"));
}

#[tokio::test]
async fn test_cancellation_stops_the_pass_but_keeps_committed_state() {
    let harness = Harness::new(
        sync_config(false),
        FakeSource::new(&["alice"]),
        FakeSearch::new(&[("alice", "id-alice")]),
        FakeCatalog::new(&[]),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = harness
        .orchestrator
        .run(harness.ledger(&[]), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Interrupted));
    // the merge already committed before the pass stopped
    let reloaded = harness.ledger(&[]);
    assert!(reloaded.contains("alice"));
    assert!(harness.catalog.puts.lock().await.is_empty());
}
