use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::MatchError;
use crate::ports::auth::{Credentials, TokenExchanger};
use crate::ports::clock::Clock;
use crate::ports::store::{SettingsStore, StoredSettings};

/// Subtracted from the server-reported lifetime to absorb clock skew and
/// in-flight latency.
pub const EXPIRY_SAFETY_MARGIN_MS: i64 = 60_000;

/// Bearer token for the catalog together with its margin-adjusted expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: i64,
}

impl AccessToken {
    pub fn new(value: String, expires_at: i64) -> Self {
        Self { value, expires_at }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Milliseconds since the Unix epoch
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at
    }

    fn from_settings(settings: &StoredSettings) -> Option<Self> {
        match (&settings.access_token, settings.token_expires_at) {
            (Some(value), Some(expires_at)) if !value.is_empty() => {
                Some(Self::new(value.clone(), expires_at))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unconfigured,
    NoToken,
    ValidToken,
    ExpiredToken,
}

/// Owns the access token for the catalog.
///
/// Concurrent callers share one token. Two callers racing on an expired token
/// may both exchange; the later write wins and both tokens are equally valid,
/// so the exchange itself is not serialized.
pub struct TokenManager {
    exchanger: Box<dyn TokenExchanger>,
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    token: RwLock<Option<AccessToken>>,
}

impl TokenManager {
    pub fn new(
        exchanger: Box<dyn TokenExchanger>,
        store: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            exchanger,
            store,
            clock,
            token: RwLock::new(None),
        }
    }

    /// Return a token that is valid right now, exchanging credentials if needed.
    ///
    /// Falls back, in order, to the in-memory token, a persisted token that
    /// has not yet expired (warm start), and a fresh exchange.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_token(&self) -> Result<AccessToken, MatchError> {
        let now = self.clock.now_ms();

        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_valid_at(now) {
                return Ok(token.clone());
            }
            tracing::debug!(expires_at = token.expires_at(), now, "Cached access token expired");
        }

        let settings = self.store.load()?;

        if let Some(token) = AccessToken::from_settings(&settings).filter(|t| t.is_valid_at(now)) {
            tracing::debug!(
                expires_at = token.expires_at(),
                "Warm-starting from persisted access token"
            );
            *self.token.write().await = Some(token.clone());
            return Ok(token);
        }

        let credentials = settings
            .credentials()
            .ok_or_else(MatchError::missing_credentials)?;

        self.exchange(&credentials, settings).await
    }

    /// Drop the current token and exchange a new one.
    pub async fn refresh(&self) -> Result<AccessToken, MatchError> {
        self.invalidate().await?;
        self.ensure_token().await
    }

    /// Forget the current token, in memory and on disk. Credentials stay.
    pub async fn invalidate(&self) -> Result<(), MatchError> {
        *self.token.write().await = None;

        let mut settings = self.store.load()?;
        if settings.access_token.is_some() || settings.token_expires_at.is_some() {
            settings.clear_token();
            self.store.save(&settings)?;
        }

        tracing::debug!("Access token invalidated");
        Ok(())
    }

    /// Store new credentials. Any token obtained with the old ones is dropped.
    pub async fn save_credentials(&self, credentials: &Credentials) -> Result<(), MatchError> {
        *self.token.write().await = None;

        let mut settings = self.store.load()?;
        settings.set_credentials(credentials);
        settings.clear_token();
        self.store.save(&settings)?;

        tracing::info!(client_id = %credentials.client_id, "Saved client credentials");
        Ok(())
    }

    /// Remove credentials and token. Only an explicit operator action calls this.
    pub async fn revoke(&self) -> Result<(), MatchError> {
        *self.token.write().await = None;

        let mut settings = self.store.load()?;
        settings.client_id = None;
        settings.client_secret = None;
        settings.clear_token();
        self.store.save(&settings)?;

        tracing::info!("Client credentials revoked");
        Ok(())
    }

    pub async fn state(&self) -> Result<TokenState, MatchError> {
        let settings = self.store.load()?;
        if settings.credentials().is_none() {
            return Ok(TokenState::Unconfigured);
        }

        let token = match self.token.read().await.clone() {
            Some(token) => Some(token),
            None => AccessToken::from_settings(&settings),
        };

        Ok(match token {
            None => TokenState::NoToken,
            Some(token) if token.is_valid_at(self.clock.now_ms()) => TokenState::ValidToken,
            Some(_) => TokenState::ExpiredToken,
        })
    }

    /// Re-exchange the token if credentials are present and a token already
    /// exists. Returns whether an exchange happened.
    pub async fn renew_if_active(&self) -> Result<bool, MatchError> {
        let settings = self.store.load()?;
        let Some(credentials) = settings.credentials() else {
            return Ok(false);
        };

        let has_token =
            self.token.read().await.is_some() || AccessToken::from_settings(&settings).is_some();
        if !has_token {
            return Ok(false);
        }

        self.exchange(&credentials, settings).await?;
        Ok(true)
    }

    /// Spawn the periodic renewal sweep. It runs independently of search
    /// traffic so an idle session does not pay for an exchange on its next
    /// search.
    pub fn spawn_renewal_task(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(period_secs = period.as_secs(), "Token renewal task started");
            loop {
                tokio::time::sleep(period).await;
                match self.renew_if_active().await {
                    Ok(true) => tracing::debug!("Access token renewed in background"),
                    Ok(false) => tracing::trace!("No active session to renew"),
                    Err(e) => tracing::warn!("Background token renewal failed: {}", e),
                }
            }
        })
    }

    async fn exchange(
        &self,
        credentials: &Credentials,
        mut settings: StoredSettings,
    ) -> Result<AccessToken, MatchError> {
        let grant = self.exchanger.exchange(credentials).await.map_err(|e| {
            tracing::error!(client_id = %credentials.client_id, "Token exchange failed: {}", e);
            MatchError::from(e)
        })?;

        let lifetime_ms = i64::try_from(grant.expires_in)
            .unwrap_or(i64::MAX / 1000)
            .saturating_mul(1000);
        // Short-lived grants give up at most half their lifetime to the margin
        let margin_ms = EXPIRY_SAFETY_MARGIN_MS.min(lifetime_ms / 2);
        let expires_at = self
            .clock
            .now_ms()
            .saturating_add(lifetime_ms)
            .saturating_sub(margin_ms);
        let token = AccessToken::new(grant.access_token, expires_at);

        *self.token.write().await = Some(token.clone());

        settings.access_token = Some(token.value.clone());
        settings.token_expires_at = Some(expires_at);
        // The in-memory token is usable even if persisting it fails
        if let Err(e) = self.store.save(&settings) {
            tracing::warn!("Failed to persist access token: {}", e);
        }

        tracing::info!(expires_at, "Obtained new access token");
        Ok(token)
    }
}
