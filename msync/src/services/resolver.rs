//! Artist identifier resolution
//!
//! Maps an artist name to a MusicBrainz id. A single search hit is taken
//! as-is; multiple hits are disambiguated by cross-referencing the albums
//! we hold locally for that artist against release search results. Fan-out
//! is bounded on both axes (candidate artists and albums checked).

use super::{IdentifierSearch, MusicSource};
use msync_common::{Error, Result};
use std::collections::HashSet;

/// Upper bound on artist candidates considered per search
const MAX_ARTIST_CANDIDATES: u32 = 15;
/// Upper bound on local albums cross-referenced per artist
const MAX_ALBUMS_CHECKED: usize = 10;
/// Upper bound on release search results checked per album
const MAX_RELEASE_RESULTS: u32 = 10;

/// Characters the search backend chokes on; stripped before querying
const UNSAFE_SEARCH_CHARS: [char; 4] = ['/', '\\', '!', '?'];

/// Strip characters that are unsafe for the search backend
fn sanitize_query(term: &str) -> String {
    term.chars()
        .filter(|c| !UNSAFE_SEARCH_CHARS.contains(c))
        .collect()
}

/// Resolves artist names to MusicBrainz ids
pub struct MbidResolver<'a> {
    search: &'a dyn IdentifierSearch,
    source: &'a dyn MusicSource,
}

impl<'a> MbidResolver<'a> {
    pub fn new(search: &'a dyn IdentifierSearch, source: &'a dyn MusicSource) -> Self {
        Self { search, source }
    }

    /// Resolve one artist name to an id.
    ///
    /// With several candidates and no album that cross-references one of
    /// them, the first search hit wins, in upstream ranking order. That
    /// fallback is an approximation, kept for compatibility with how the
    /// catalog was built; it is not a guaranteed-correct resolution.
    pub async fn resolve(&self, artist: &str) -> Result<String> {
        let candidates = self
            .search
            .search_artists(&sanitize_query(artist), MAX_ARTIST_CANDIDATES)
            .await?;

        let Some(first) = candidates.first() else {
            return Err(Error::ArtistNotFound(artist.to_string()));
        };
        if candidates.len() == 1 {
            return Ok(first.id.clone());
        }

        let candidate_ids: HashSet<&str> =
            candidates.iter().map(|candidate| candidate.id.as_str()).collect();

        // Albums are only needed in the ambiguous case; fetch them lazily.
        // If the library has nothing usable for this artist, the ranked
        // fallback below still applies.
        let albums = match self.source.list_albums(artist).await {
            Ok(albums) => albums,
            Err(e) => {
                tracing::debug!(artist = artist, error = %e, "no albums for disambiguation");
                Vec::new()
            }
        };

        for album in albums.iter().take(MAX_ALBUMS_CHECKED) {
            let releases = match self
                .search
                .search_releases(&sanitize_query(album), MAX_RELEASE_RESULTS)
                .await
            {
                Ok(releases) => releases,
                Err(e) => {
                    tracing::debug!(album = album.as_str(), error = %e, "release search failed");
                    continue;
                }
            };
            for release in releases {
                if let Some(artist_id) = release.artist_id {
                    if candidate_ids.contains(artist_id.as_str()) {
                        return Ok(artist_id);
                    }
                }
            }
        }

        Ok(first.id.clone())
    }
}
