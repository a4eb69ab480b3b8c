use serde::Deserialize;

use crate::ports::catalog::{AlbumType, CandidateAlbum};

/// Spotify client-credentials token response. `token_type` is always
/// `bearer` and is not read.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// Envelope of `GET /v1/search?type=album`
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySearchResponse {
    pub albums: SpotifyAlbumPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbumPage {
    /// Spotify occasionally returns `null` entries in search pages
    #[serde(default)]
    pub items: Vec<Option<SpotifyAlbum>>,
    pub total: Option<u32>,
}

/// Simplified album object from the search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub id: String,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album_type: AlbumType,
    #[serde(default)]
    pub total_tracks: u32,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(default)]
    pub external_urls: SpotifyExternalUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyExternalUrls {
    pub spotify: Option<String>,
}

impl From<SpotifyAlbum> for CandidateAlbum {
    fn from(album: SpotifyAlbum) -> Self {
        CandidateAlbum {
            id: album.id,
            uri: album.uri,
            name: album.name,
            artists: album.artists.into_iter().map(|artist| artist.name).collect(),
            album_type: album.album_type,
            total_tracks: album.total_tracks,
            images: album.images.into_iter().map(|image| image.url).collect(),
            external_url: album.external_urls.spotify.unwrap_or_default(),
        }
    }
}

impl SpotifySearchResponse {
    pub fn into_candidates(self) -> Vec<CandidateAlbum> {
        self.albums
            .items
            .into_iter()
            .flatten()
            .map(CandidateAlbum::from)
            .collect()
    }
}
