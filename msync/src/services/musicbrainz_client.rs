//! MusicBrainz API client
//!
//! Search endpoints of the `/ws/2` API, used to resolve artist names to
//! MusicBrainz ids. Requests are rate limited to the documented
//! 1 request/second for identified clients.

use super::{ArtistMatch, IdentifierSearch, ReleaseMatch};
use async_trait::async_trait;
use msync_common::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = concat!("msync/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_MS: u64 = 1000; // 1 request per second
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Artist search response
#[derive(Debug, Clone, Deserialize)]
struct ArtistSearchResponse {
    #[serde(default)]
    artists: Vec<MbArtist>,
}

/// MusicBrainz artist
#[derive(Debug, Clone, Deserialize)]
struct MbArtist {
    /// Artist MBID (MusicBrainz ID)
    id: String,
    /// Artist name
    name: String,
}

/// Release search response
#[derive(Debug, Clone, Deserialize)]
struct ReleaseSearchResponse {
    #[serde(default)]
    releases: Vec<MbRelease>,
}

/// MusicBrainz release
#[derive(Debug, Clone, Deserialize)]
struct MbRelease {
    /// Release MBID (MusicBrainz ID)
    id: String,
    /// Artists credited for the release
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<MbArtistCredit>,
}

/// MusicBrainz artist credit
#[derive(Debug, Clone, Deserialize)]
struct MbArtistCredit {
    artist: MbArtist,
}

/// Rate limiter enforcing a minimum delay between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("MusicBrainz rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl MusicBrainzClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(MUSICBRAINZ_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    async fn query<T>(&self, entity: &str, query: &str, limit: u32) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.rate_limiter.wait().await;

        let url = format!("{}/{}", self.base_url, entity);
        tracing::debug!(entity = entity, query = query, "querying MusicBrainz");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("query", query),
                ("limit", &limit.to_string()),
                ("fmt", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(Error::RemoteOperation(
                "MusicBrainz rate limit exceeded".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RemoteOperation(format!(
                "MusicBrainz {} search returned {}: {}",
                entity, status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentifierSearch for MusicBrainzClient {
    async fn search_artists(&self, name: &str, limit: u32) -> Result<Vec<ArtistMatch>> {
        let response: ArtistSearchResponse = self.query("artist", name, limit).await?;
        Ok(response
            .artists
            .into_iter()
            .map(|artist| ArtistMatch {
                id: artist.id,
                name: artist.name,
            })
            .collect())
    }

    async fn search_releases(&self, title: &str, limit: u32) -> Result<Vec<ReleaseMatch>> {
        let response: ReleaseSearchResponse = self.query("release", title, limit).await?;
        Ok(response
            .releases
            .into_iter()
            .map(|release| ReleaseMatch {
                id: release.id,
                artist_id: release
                    .artist_credit
                    .into_iter()
                    .next()
                    .map(|credit| credit.artist.id),
            })
            .collect())
    }
}
