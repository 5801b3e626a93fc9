//! MuSpy API client
//!
//! Follow/unfollow operations against a MuSpy account, addressed by
//! MusicBrainz artist id. All requests carry HTTP basic auth; self-hosted
//! instances with bad certificates are supported through the
//! `accept_invalid_certs` switch.

use super::{CatalogArtist, CatalogService};
use async_trait::async_trait;
use msync_common::config::MuspyConfig;
use msync_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("msync/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One followed artist, as returned by `GET artists/<user_id>`
#[derive(Debug, Clone, Deserialize)]
struct MuspyArtist {
    mbid: String,
    name: String,
    #[serde(default)]
    #[allow(dead_code)]
    sort_name: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    disambiguation: Option<String>,
}

/// MuSpy API client
pub struct MuspyClient {
    http_client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    user_id: String,
}

impl MuspyClient {
    pub fn new(config: &MuspyConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            user_id: config.user_id.clone(),
        })
    }

    fn artists_url(&self, mbid: Option<&str>) -> String {
        match mbid {
            Some(mbid) => format!("{}/artists/{}/{}", self.base_url, self.user_id, mbid),
            None => format!("{}/artists/{}", self.base_url, self.user_id),
        }
    }

    async fn expect_success(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::RemoteOperation(format!(
            "{} returned {}: {}",
            operation, status, body
        )))
    }
}

#[async_trait]
impl CatalogService for MuspyClient {
    async fn list_artists(&self) -> Result<Vec<CatalogArtist>> {
        let response = self
            .http_client
            .get(self.artists_url(None))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        let response = self.expect_success("list artists", response).await?;
        let artists: Vec<MuspyArtist> = response.json().await?;
        tracing::debug!(count = artists.len(), "fetched remote catalog snapshot");
        Ok(artists
            .into_iter()
            .map(|artist| CatalogArtist {
                name: artist.name,
                mbid: artist.mbid,
            })
            .collect())
    }

    async fn put_artist(&self, mbid: &str) -> Result<()> {
        let response = self
            .http_client
            .put(self.artists_url(Some(mbid)))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        self.expect_success("add artist", response).await?;
        Ok(())
    }

    async fn delete_artist(&self, mbid: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(self.artists_url(Some(mbid)))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        self.expect_success("delete artist", response).await?;
        Ok(())
    }
}
