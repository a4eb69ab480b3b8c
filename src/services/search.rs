use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, MatchError};
use crate::matching::normalize::normalize;
use crate::matching::ranker::rank;
use crate::ports::catalog::{CandidateAlbum, CatalogClient};
use crate::services::token::TokenManager;

/// Best-effort release metadata scraped from a page. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
}

impl Metadata {
    pub fn new(artist: Option<String>, album: Option<String>, year: Option<String>) -> Self {
        Self {
            artist,
            album,
            year,
        }
    }
}

/// One recipe for turning the cleaned terms into a catalog query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// `album:"..." artist:"..."`
    QuotedFields,
    /// `album:... artist:...`
    FieldQualified,
    /// `artist album`
    Concatenated,
    /// `album`
    AlbumOnly,
}

impl SearchStrategy {
    /// Most specific first.
    pub const CASCADE: [SearchStrategy; 4] = [
        SearchStrategy::QuotedFields,
        SearchStrategy::FieldQualified,
        SearchStrategy::Concatenated,
        SearchStrategy::AlbumOnly,
    ];

    /// The query for this strategy, or `None` when a term it needs is empty.
    pub fn build_query(self, artist: &str, album: &str) -> Option<String> {
        match self {
            SearchStrategy::QuotedFields if !artist.is_empty() && !album.is_empty() => {
                Some(format!(
                    "album:\"{}\" artist:\"{}\"",
                    album.replace('"', ""),
                    artist.replace('"', "")
                ))
            }
            SearchStrategy::FieldQualified if !artist.is_empty() && !album.is_empty() => {
                Some(format!("album:{} artist:{}", album, artist))
            }
            SearchStrategy::Concatenated if !artist.is_empty() || !album.is_empty() => {
                Some(format!("{} {}", artist, album).trim().to_string())
            }
            SearchStrategy::AlbumOnly if !album.is_empty() => Some(album.to_string()),
            _ => None,
        }
    }
}

/// Lazily yields `(strategy, query)` in cascade order, skipping strategies
/// that do not apply and queries identical to one already yielded.
pub fn strategy_queries<'a>(
    artist: &'a str,
    album: &'a str,
) -> impl Iterator<Item = (SearchStrategy, String)> + 'a {
    let mut seen = HashSet::new();
    SearchStrategy::CASCADE
        .into_iter()
        .filter_map(move |strategy| {
            strategy
                .build_query(artist, album)
                .map(|query| (strategy, query))
        })
        .filter(move |(_, query)| seen.insert(query.clone()))
}

/// Runs the strategy cascade against the catalog and ranks each result set.
pub struct SearchOrchestrator {
    catalog: Box<dyn CatalogClient>,
    tokens: Arc<TokenManager>,
}

impl SearchOrchestrator {
    pub fn new(catalog: Box<dyn CatalogClient>, tokens: Arc<TokenManager>) -> Self {
        Self { catalog, tokens }
    }

    /// Find the catalog album for the scraped release.
    ///
    /// Strategies run strictly one after the other and stop at the first
    /// accepted match. `Ok(None)` means the cascade ran dry.
    #[tracing::instrument(
        skip(self, metadata),
        fields(artist = ?metadata.artist, album = ?metadata.album, year = ?metadata.year)
    )]
    pub async fn search(&self, metadata: &Metadata) -> Result<Option<CandidateAlbum>, MatchError> {
        let artist = normalize(metadata.artist.as_deref());
        let album = normalize(metadata.album.as_deref());

        if artist.is_empty() && album.is_empty() {
            tracing::debug!("Nothing to search for");
            return Ok(None);
        }

        let mut token = self.tokens.ensure_token().await?;

        for (strategy, query) in strategy_queries(&artist, &album) {
            tracing::debug!(?strategy, %query, "Querying catalog");

            let candidates = match self.catalog.search_albums(token.value(), &query).await {
                Ok(candidates) => candidates,
                Err(CatalogError::Unauthorized) => {
                    tracing::warn!(%query, "Catalog rejected access token, re-authenticating once");
                    token = self.tokens.refresh().await?;
                    self.catalog
                        .search_albums(token.value(), &query)
                        .await
                        .inspect_err(|e| {
                            tracing::error!(%query, "Retried catalog search failed: {}", e)
                        })?
                }
                Err(e) => {
                    tracing::error!(%query, "Catalog search failed: {}", e);
                    return Err(e.into());
                }
            };

            tracing::debug!(?strategy, results = candidates.len(), "Catalog returned candidates");

            if let Some(found) = rank(&candidates, &artist, &album) {
                tracing::info!(?strategy, id = %found.id, name = %found.name, "Matched catalog album");
                return Ok(Some(found));
            }
        }

        tracing::info!("No catalog album matched");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use crate::ports::auth::{MockTokenExchanger, TokenGrant};
    use crate::ports::catalog::{AlbumType, MockCatalogClient};
    use crate::test_utils::{ManualClock, MemoryStore, candidate};

    const T: i64 = 1_700_000_000_000;

    fn tokens_with(exchanger: MockTokenExchanger) -> Arc<TokenManager> {
        Arc::new(TokenManager::new(
            Box::new(exchanger),
            Arc::new(MemoryStore::with_credentials("id", "secret")),
            Arc::new(ManualClock::at(T)),
        ))
    }

    fn single_exchange() -> MockTokenExchanger {
        let mut exchanger = MockTokenExchanger::new();
        exchanger.expect_exchange().times(1).returning(|_| {
            Ok(TokenGrant {
                access_token: "token-1".to_string(),
                expires_in: 3600,
            })
        });
        exchanger
    }

    fn meddle() -> Metadata {
        Metadata::new(Some("Pink Floyd".into()), Some("Meddle (2)".into()), None)
    }

    fn meddle_album() -> CandidateAlbum {
        candidate("meddle", "Meddle", &["Pink Floyd"], AlbumType::Album, 6)
    }

    #[test]
    fn test_strategy_queries_in_order() {
        let queries: Vec<String> = strategy_queries("Pink Floyd", "Meddle")
            .map(|(_, query)| query)
            .collect();
        assert_eq!(
            queries,
            vec![
                "album:\"Meddle\" artist:\"Pink Floyd\"",
                "album:Meddle artist:Pink Floyd",
                "Pink Floyd Meddle",
                "Meddle",
            ]
        );
    }

    #[test]
    fn test_strategy_queries_without_artist() {
        let strategies: Vec<(SearchStrategy, String)> = strategy_queries("", "Meddle").collect();
        // Concatenation and album-only collapse into one query
        assert_eq!(
            strategies,
            vec![(SearchStrategy::Concatenated, "Meddle".to_string())]
        );
    }

    #[test]
    fn test_strategy_queries_without_album() {
        let strategies: Vec<SearchStrategy> = strategy_queries("Pink Floyd", "")
            .map(|(strategy, _)| strategy)
            .collect();
        assert_eq!(strategies, vec![SearchStrategy::Concatenated]);
    }

    #[test]
    fn test_quoted_strategy_drops_inner_quotes() {
        assert_eq!(
            SearchStrategy::QuotedFields.build_query("David Bowie", "\"Heroes\""),
            Some("album:\"Heroes\" artist:\"David Bowie\"".to_string())
        );
    }

    #[tokio::test]
    async fn test_first_strategy_match_stops_cascade() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_search_albums()
            .withf(|token, query| token == "token-1" && query == "album:\"Meddle\" artist:\"Pink Floyd\"")
            .times(1)
            .returning(|_, _| Ok(vec![meddle_album()]));

        let orchestrator = SearchOrchestrator::new(Box::new(catalog), tokens_with(single_exchange()));
        let result = orchestrator.search(&meddle()).await.unwrap();

        assert_eq!(result, Some(meddle_album()));
    }

    #[tokio::test]
    async fn test_falls_through_to_less_specific_strategies() {
        let mut catalog = MockCatalogClient::new();
        let mut seq = mockall::Sequence::new();
        catalog
            .expect_search_albums()
            .withf(|_, query| query.starts_with("album:\""))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![]));
        catalog
            .expect_search_albums()
            .withf(|_, query| query == "album:Meddle artist:Pink Floyd")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(vec![candidate("x", "Thriller", &["Michael Jackson"], AlbumType::Album, 9)])
            });
        catalog
            .expect_search_albums()
            .withf(|_, query| query == "Pink Floyd Meddle")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![meddle_album()]));

        let orchestrator = SearchOrchestrator::new(Box::new(catalog), tokens_with(single_exchange()));
        let result = orchestrator.search(&meddle()).await.unwrap();

        assert_eq!(result.map(|album| album.id), Some("meddle".to_string()));
    }

    #[tokio::test]
    async fn test_exhausted_cascade_is_no_match() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_search_albums()
            .times(4)
            .returning(|_, _| Ok(vec![]));

        let orchestrator = SearchOrchestrator::new(Box::new(catalog), tokens_with(single_exchange()));
        assert_eq!(orchestrator.search(&meddle()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_metadata_skips_network() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_search_albums().never();
        let mut exchanger = MockTokenExchanger::new();
        exchanger.expect_exchange().never();

        let orchestrator = SearchOrchestrator::new(Box::new(catalog), tokens_with(exchanger));
        let metadata = Metadata::new(None, Some(" [Deluxe Edition] ".into()), Some("1971".into()));

        assert_eq!(orchestrator.search(&metadata).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unauthorized_retries_same_strategy_once() {
        let mut exchanger = MockTokenExchanger::new();
        let mut exchange_seq = mockall::Sequence::new();
        exchanger
            .expect_exchange()
            .times(1)
            .in_sequence(&mut exchange_seq)
            .returning(|_| {
                Ok(TokenGrant {
                    access_token: "token-1".to_string(),
                    expires_in: 3600,
                })
            });
        exchanger
            .expect_exchange()
            .times(1)
            .in_sequence(&mut exchange_seq)
            .returning(|_| {
                Ok(TokenGrant {
                    access_token: "token-2".to_string(),
                    expires_in: 3600,
                })
            });

        let mut catalog = MockCatalogClient::new();
        let mut seq = mockall::Sequence::new();
        catalog
            .expect_search_albums()
            .withf(|token, query| token == "token-1" && query.starts_with("album:\""))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(CatalogError::Unauthorized));
        catalog
            .expect_search_albums()
            .withf(|token, query| token == "token-2" && query.starts_with("album:\""))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![meddle_album()]));

        let orchestrator = SearchOrchestrator::new(Box::new(catalog), tokens_with(exchanger));
        let result = orchestrator.search(&meddle()).await.unwrap();

        assert_eq!(result, Some(meddle_album()));
    }

    #[tokio::test]
    async fn test_repeated_unauthorized_does_not_loop() {
        let mut exchanger = MockTokenExchanger::new();
        exchanger.expect_exchange().times(2).returning(|_| {
            Ok(TokenGrant {
                access_token: "token".to_string(),
                expires_in: 3600,
            })
        });

        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_search_albums()
            .times(2)
            .returning(|_, _| Err(CatalogError::Unauthorized));

        let orchestrator = SearchOrchestrator::new(Box::new(catalog), tokens_with(exchanger));
        let result = orchestrator.search(&meddle()).await;

        assert!(matches!(
            result,
            Err(MatchError::TransientNetwork(NetworkError::Catalog(
                CatalogError::Unauthorized
            )))
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_aborts_without_retry() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_search_albums().times(1).returning(|_, _| {
            Err(CatalogError::Status {
                status: 503,
                reason: "Service Unavailable".to_string(),
            })
        });

        let orchestrator = SearchOrchestrator::new(Box::new(catalog), tokens_with(single_exchange()));
        let result = orchestrator.search(&meddle()).await;

        assert!(matches!(result, Err(MatchError::TransientNetwork(_))));
    }

    #[tokio::test]
    async fn test_missing_credentials_skips_catalog() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_search_albums().never();
        let mut exchanger = MockTokenExchanger::new();
        exchanger.expect_exchange().never();
        let tokens = Arc::new(TokenManager::new(
            Box::new(exchanger),
            Arc::new(MemoryStore::default()),
            Arc::new(ManualClock::at(T)),
        ));

        let orchestrator = SearchOrchestrator::new(Box::new(catalog), tokens);
        let result = orchestrator.search(&meddle()).await;

        assert!(matches!(result, Err(MatchError::Config { .. })));
    }

    #[tokio::test]
    async fn test_identical_searches_give_identical_results() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_search_albums()
            .times(2)
            .returning(|_, _| Ok(vec![meddle_album()]));

        let orchestrator = SearchOrchestrator::new(Box::new(catalog), tokens_with(single_exchange()));
        let metadata = meddle();

        let first = orchestrator.search(&metadata).await.unwrap();
        let second = orchestrator.search(&metadata).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(metadata, meddle());
    }
}
