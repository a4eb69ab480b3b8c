//! Inbound surface used by the page-scraping collaborator and the CLI.
//!
//! Nothing here returns an error. Failures are logged and folded into
//! `None` or a failure-shaped outcome.

use std::sync::Arc;

use serde::Serialize;

use crate::error::MatchError;
use crate::ports::auth::Credentials;
use crate::ports::catalog::CandidateAlbum;
use crate::ports::store::SettingsStore;
use crate::services::search::{Metadata, SearchOrchestrator};
use crate::services::token::{TokenManager, TokenState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub is_authenticated: bool,
    pub is_configured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticateOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogoutOutcome {
    pub success: bool,
}

pub struct ReleaseMatcher {
    store: Arc<dyn SettingsStore>,
    tokens: Arc<TokenManager>,
    orchestrator: SearchOrchestrator,
}

impl ReleaseMatcher {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        tokens: Arc<TokenManager>,
        orchestrator: SearchOrchestrator,
    ) -> Self {
        Self {
            store,
            tokens,
            orchestrator,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Look up the catalog album for a scraped release. `None` covers both
    /// "no match" and any failure along the way.
    pub async fn search(&self, metadata: &Metadata) -> Option<CandidateAlbum> {
        if !self.is_enabled() {
            tracing::debug!("Player replacement disabled, skipping search");
            return None;
        }

        match self.orchestrator.search(metadata).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(
                    artist = ?metadata.artist,
                    album = ?metadata.album,
                    "Search failed: {}",
                    e
                );
                None
            }
        }
    }

    pub async fn get_auth_status(&self) -> AuthStatus {
        match self.tokens.state().await {
            Ok(state) => AuthStatus {
                is_authenticated: state == TokenState::ValidToken,
                is_configured: state != TokenState::Unconfigured,
            },
            Err(e) => {
                tracing::error!("Failed to read auth status: {}", e);
                AuthStatus {
                    is_authenticated: false,
                    is_configured: false,
                }
            }
        }
    }

    /// Load the stored credentials and make sure a token can be obtained.
    pub async fn authenticate(&self) -> AuthenticateOutcome {
        match self.tokens.ensure_token().await {
            Ok(_) => AuthenticateOutcome {
                success: true,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Could not obtain an access token: {}", e);
                AuthenticateOutcome {
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Drop the cached token. Credentials are kept.
    pub async fn logout(&self) -> LogoutOutcome {
        match self.tokens.invalidate().await {
            Ok(()) => LogoutOutcome { success: true },
            Err(e) => {
                tracing::error!("Logout failed: {}", e);
                LogoutOutcome { success: false }
            }
        }
    }

    pub async fn save_credentials(&self, credentials: &Credentials) -> Result<(), MatchError> {
        self.tokens.save_credentials(credentials).await
    }

    pub async fn revoke(&self) -> Result<(), MatchError> {
        self.tokens.revoke().await
    }

    pub fn is_enabled(&self) -> bool {
        match self.store.load() {
            Ok(settings) => settings.enabled,
            Err(e) => {
                tracing::warn!("Failed to read settings, assuming enabled: {}", e);
                true
            }
        }
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), MatchError> {
        let mut settings = self.store.load()?;
        settings.enabled = enabled;
        self.store.save(&settings)?;
        tracing::info!(enabled, "Updated player replacement toggle");
        Ok(())
    }
}
