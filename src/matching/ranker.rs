//! Scoring of catalog candidates against the release scraped from the page.
//!
//! Additive point system. Within each family (album name, artist) only the
//! first rule that fires counts. The weights are empirical and kept as-is.

use crate::matching::normalize::normalize_for_comparison;
use crate::matching::similarity::similarity;
use crate::ports::catalog::{AlbumType, CandidateAlbum};

pub const ALBUM_EXACT: i32 = 100;
pub const ALBUM_CONTAINS: i32 = 60;
pub const ALBUM_FUZZY: i32 = 40;
pub const ARTIST_MATCH: i32 = 50;
pub const ARTIST_FUZZY: i32 = 25;
pub const TYPE_ALBUM: i32 = 15;
pub const TYPE_SINGLE: i32 = -10;
pub const TYPE_COMPILATION: i32 = -5;
pub const FULL_LENGTH: i32 = 5;

/// Track count from which a release is considered a full LP.
pub const FULL_LENGTH_TRACKS: u32 = 8;
/// Fuzzy rules fire strictly above this similarity.
pub const FUZZY_THRESHOLD: f64 = 0.7;
/// Minimum total score for the best candidate to be accepted.
pub const ACCEPT_THRESHOLD: i32 = 50;

#[derive(Debug, Clone)]
pub struct ScoredCandidate<'a> {
    pub candidate: &'a CandidateAlbum,
    pub score: i32,
}

/// Expected values, folded once into comparison form.
struct Expected {
    artist: String,
    album: String,
}

impl Expected {
    fn new(artist: &str, album: &str) -> Self {
        Self {
            artist: normalize_for_comparison(artist),
            album: normalize_for_comparison(album),
        }
    }
}

fn contains_either_way(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn album_score(expected: &str, candidate_name: &str) -> i32 {
    let name = normalize_for_comparison(candidate_name);
    if expected.is_empty() || name.is_empty() {
        return 0;
    }

    if name == expected {
        ALBUM_EXACT
    } else if contains_either_way(&name, expected) {
        ALBUM_CONTAINS
    } else if similarity(&name, expected) > FUZZY_THRESHOLD {
        ALBUM_FUZZY
    } else {
        0
    }
}

fn artist_score(expected: &str, candidate_artists: &[String]) -> i32 {
    if expected.is_empty() {
        return 0;
    }

    let artists: Vec<String> = candidate_artists
        .iter()
        .map(|artist| normalize_for_comparison(artist.as_str()))
        .filter(|artist| !artist.is_empty())
        .collect();

    if artists
        .iter()
        .any(|artist| contains_either_way(artist, expected))
    {
        ARTIST_MATCH
    } else if artists
        .iter()
        .any(|artist| similarity(artist, expected) > FUZZY_THRESHOLD)
    {
        ARTIST_FUZZY
    } else {
        0
    }
}

fn format_score(candidate: &CandidateAlbum) -> i32 {
    let type_score = match candidate.album_type {
        AlbumType::Album => TYPE_ALBUM,
        AlbumType::Single => TYPE_SINGLE,
        AlbumType::Compilation => TYPE_COMPILATION,
    };
    let length_score = if candidate.total_tracks >= FULL_LENGTH_TRACKS {
        FULL_LENGTH
    } else {
        0
    };
    type_score + length_score
}

fn score_against(candidate: &CandidateAlbum, expected: &Expected) -> i32 {
    album_score(&expected.album, &candidate.name)
        + artist_score(&expected.artist, &candidate.artists)
        + format_score(candidate)
}

/// Score every candidate, best first. Equal scores keep the catalog's order.
pub fn rank_candidates<'a>(
    candidates: &'a [CandidateAlbum],
    expected_artist: &str,
    expected_album: &str,
) -> Vec<ScoredCandidate<'a>> {
    let expected = Expected::new(expected_artist, expected_album);

    let mut scored: Vec<ScoredCandidate<'a>> = candidates
        .iter()
        .map(|candidate| ScoredCandidate {
            candidate,
            score: score_against(candidate, &expected),
        })
        .collect();

    // sort_by is stable, which gives the tie-break
    scored.sort_by(|a, b| b.score.cmp(&a.score));

    scored
}

/// Pick the best candidate, or `None` when it scores below [`ACCEPT_THRESHOLD`].
pub fn rank(
    candidates: &[CandidateAlbum],
    expected_artist: &str,
    expected_album: &str,
) -> Option<CandidateAlbum> {
    let best = rank_candidates(candidates, expected_artist, expected_album)
        .into_iter()
        .next()?;

    if best.score >= ACCEPT_THRESHOLD {
        tracing::debug!(
            album = %best.candidate.name,
            score = best.score,
            "Accepted catalog candidate"
        );
        Some(best.candidate.clone())
    } else {
        tracing::debug!(
            album = %best.candidate.name,
            score = best.score,
            "Best catalog candidate below acceptance threshold"
        );
        None
    }
}
