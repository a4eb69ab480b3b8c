use std::time::Duration;

use reqwest::StatusCode;

use crate::error::CatalogError;
use crate::ports::catalog::{CandidateAlbum, CatalogClient};
use crate::spotify_rs::types::SpotifySearchResponse;

pub const SPOTIFY_SEARCH_URL: &str = "https://api.spotify.com/v1/search";

/// Spotify album search client
pub struct SpotifyClient {
    client: reqwest::Client,
    search_url: String,
    market: String,
    limit: u32,
    timeout: Duration,
}

impl SpotifyClient {
    pub fn new(
        client: reqwest::Client,
        search_url: String,
        market: String,
        limit: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            search_url,
            market,
            limit,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl CatalogClient for SpotifyClient {
    async fn search_albums(
        &self,
        access_token: &str,
        query: &str,
    ) -> Result<Vec<CandidateAlbum>, CatalogError> {
        let limit = self.limit.to_string();

        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("q", query),
                ("type", "album"),
                ("limit", limit.as_str()),
                ("market", self.market.as_str()),
            ])
            .bearer_auth(access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(CatalogError::Transport)?;

        let status = response.status();
        tracing::debug!(%query, status = status.as_u16(), "Catalog search responded");

        if status == StatusCode::UNAUTHORIZED {
            return Err(CatalogError::Unauthorized);
        }
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                reason: response
                    .text()
                    .await
                    .unwrap_or("Failed to get error text".to_string()),
            });
        }

        let page: SpotifySearchResponse = response.json().await.map_err(CatalogError::Decode)?;
        if let Some(total) = page.albums.total {
            tracing::trace!(%query, total, "Catalog reported total results");
        }

        Ok(page.into_candidates())
    }
}
