use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::ports::auth::Credentials;

/// Device-local state shared by the token manager and the operator surface.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub token_expires_at: Option<i64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            access_token: None,
            token_expires_at: None,
            enabled: default_enabled(),
        }
    }
}

impl StoredSettings {
    /// Both halves of the credentials, if present and non-blank.
    pub fn credentials(&self) -> Option<Credentials> {
        let client_id = self.client_id.as_deref().map(str::trim)?;
        let client_secret = self.client_secret.as_deref().map(str::trim)?;
        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }
        Some(Credentials::new(client_id, client_secret))
    }

    pub fn set_credentials(&mut self, credentials: &Credentials) {
        self.client_id = Some(credentials.client_id.clone());
        self.client_secret = Some(credentials.client_secret.clone());
    }

    pub fn clear_token(&mut self) {
        self.access_token = None;
        self.token_expires_at = None;
    }
}

impl fmt::Debug for StoredSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSettings")
            .field("client_id", &self.client_id)
            .field("has_client_secret", &self.client_secret.is_some())
            .field("has_access_token", &self.access_token.is_some())
            .field("token_expires_at", &self.token_expires_at)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Port trait for the persisted state. Production uses `store::JsonFileStore`.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<StoredSettings, StoreError>;
    fn save(&self, settings: &StoredSettings) -> Result<(), StoreError>;
}
