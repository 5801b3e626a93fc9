//! Collaborator clients and the sync engine
//!
//! The three external collaborators are narrow async traits so the
//! orchestrator and resolver can be exercised against in-memory fakes:
//! - [`MusicSource`] - the local MPD library
//! - [`IdentifierSearch`] - the MusicBrainz search endpoints
//! - [`CatalogService`] - the MuSpy account being synchronized

use async_trait::async_trait;
use msync_common::Result;
use std::collections::HashSet;

pub mod mpd_client;
pub mod musicbrainz_client;
pub mod muspy_client;
pub mod resolver;
pub mod sync_orchestrator;

pub use mpd_client::MpdSource;
pub use musicbrainz_client::MusicBrainzClient;
pub use muspy_client::MuspyClient;
pub use resolver::MbidResolver;

/// An artist candidate returned by the identifier search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistMatch {
    pub id: String,
    pub name: String,
}

/// A release candidate with the artist credited for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMatch {
    pub id: String,
    /// Id of the first credited artist, when the credit is present
    pub artist_id: Option<String>,
}

/// One artist as known to the remote catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogArtist {
    pub name: String,
    pub mbid: String,
}

/// The local music library
///
/// Implementations reconnect and retry once after a connection error.
#[async_trait]
pub trait MusicSource: Send + Sync {
    /// All artist names in the library, lower-cased, empty names dropped
    async fn list_artists(&self) -> Result<HashSet<String>>;

    /// Album titles catalogued for an artist. Matching is tolerant of
    /// case, but the returned titles carry their exact spelling.
    async fn list_albums(&self, artist: &str) -> Result<Vec<String>>;
}

/// The identifier search service (MusicBrainz)
#[async_trait]
pub trait IdentifierSearch: Send + Sync {
    /// Ranked artist candidates for a name
    async fn search_artists(&self, name: &str, limit: u32) -> Result<Vec<ArtistMatch>>;

    /// Ranked release candidates for a title
    async fn search_releases(&self, title: &str, limit: u32) -> Result<Vec<ReleaseMatch>>;
}

/// The remote catalog account (MuSpy)
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// The artists currently followed by the account
    async fn list_artists(&self) -> Result<Vec<CatalogArtist>>;

    /// Follow an artist by id; idempotent on the remote side
    async fn put_artist(&self, mbid: &str) -> Result<()>;

    /// Unfollow an artist by id; idempotent on the remote side
    async fn delete_artist(&self, mbid: &str) -> Result<()>;
}
