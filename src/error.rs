//! Error taxonomy of the matching core.
//!
//! None of these cross the public boundary of `services::matcher`; they are
//! logged there and folded into `None` or a failure-shaped outcome.

/// Failure of the client-credentials exchange against the auth endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeTokenError {
    #[error("Token exchange rejected with HTTP {status}: {reason}")]
    Rejected { status: u16, reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(#[source] reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(#[source] reqwest::Error),
}

/// Failure of a single catalog search request.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog rejected the access token")]
    Unauthorized,
    #[error("Catalog returned HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("Failed to send http request: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Failed to parse response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Failure reading or writing the persisted settings.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to (de)serialize settings: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A request that failed for reasons unrelated to the credentials.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Catalog request failed: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Token endpoint unavailable: {0}")]
    TokenEndpoint(#[source] ExchangeTokenError),
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Credentials missing or malformed. Surfaced to the operator, never retried.
    #[error("Configuration error: {reason}")]
    Config { reason: String },
    /// The auth endpoint refused the credentials.
    #[error("Authentication failed: {0}")]
    Auth(#[source] ExchangeTokenError),
    #[error(transparent)]
    TransientNetwork(#[from] NetworkError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CatalogError> for MatchError {
    fn from(e: CatalogError) -> Self {
        Self::TransientNetwork(NetworkError::Catalog(e))
    }
}

/// Only a client error from the token endpoint says anything about the
/// credentials. Transport, decode and server-side failures are transient.
impl From<ExchangeTokenError> for MatchError {
    fn from(e: ExchangeTokenError) -> Self {
        match e {
            ExchangeTokenError::Rejected { status, .. } if (400..500).contains(&status) => {
                Self::Auth(e)
            }
            other => Self::TransientNetwork(NetworkError::TokenEndpoint(other)),
        }
    }
}

impl MatchError {
    pub fn missing_credentials() -> Self {
        Self::Config {
            reason: "No client credentials configured".to_string(),
        }
    }
}
