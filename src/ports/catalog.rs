use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

const EMBED_URL_BASE: &str = "https://open.spotify.com/embed/album";

/// Release format as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumType {
    #[serde(alias = "ALBUM")]
    Album,
    #[serde(alias = "SINGLE")]
    Single,
    #[serde(alias = "COMPILATION")]
    Compilation,
}

/// Decoupled representation of an album returned by a catalog search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateAlbum {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album_type: AlbumType,
    pub total_tracks: u32,
    pub images: Vec<String>,
    pub external_url: String,
}

impl CandidateAlbum {
    /// URL of the embeddable player that replaces the page's original one.
    pub fn embed_url(&self) -> String {
        format!("{}/{}", EMBED_URL_BASE, self.id)
    }
}

/// Port trait wrapping the album search endpoint of the remote catalog.
///
/// Implementations live in `spotify_rs::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search_albums(
        &self,
        access_token: &str,
        query: &str,
    ) -> Result<Vec<CandidateAlbum>, CatalogError>;
}
