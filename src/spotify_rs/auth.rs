use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ExchangeTokenError;
use crate::ports::auth::{Credentials, TokenExchanger, TokenGrant};
use crate::spotify_rs::types::SpotifyTokenResponse;

pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// `Authorization` header value for the client-credentials grant
fn basic_authorization(credentials: &Credentials) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!(
            "{}:{}",
            credentials.client_id, credentials.client_secret
        ))
    )
}

/// Exchange application credentials for an access token.
/// https://developer.spotify.com/documentation/web-api/tutorials/client-credentials-flow
pub async fn request_client_credentials_token(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<SpotifyTokenResponse, ExchangeTokenError> {
    let response = client
        .post(token_url)
        // Serializes to x-www-form-urlencoded and sets the header (as required by spotify)
        .form(&[("grant_type", "client_credentials")])
        .header("Authorization", basic_authorization(credentials))
        .timeout(timeout)
        .send()
        .await
        .map_err(ExchangeTokenError::FailedToSendRequest)?;

    let status = response.status();
    tracing::debug!(status = status.as_u16(), "Token endpoint responded");

    if !status.is_success() {
        return Err(ExchangeTokenError::Rejected {
            status: status.as_u16(),
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(ExchangeTokenError::FailedToParseResponse)
}

/// [`TokenExchanger`] backed by the Spotify accounts service.
pub struct SpotifyTokenExchanger {
    client: reqwest::Client,
    token_url: String,
    timeout: Duration,
}

impl SpotifyTokenExchanger {
    pub fn new(client: reqwest::Client, token_url: String, timeout: Duration) -> Self {
        Self {
            client,
            token_url,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl TokenExchanger for SpotifyTokenExchanger {
    async fn exchange(&self, credentials: &Credentials) -> Result<TokenGrant, ExchangeTokenError> {
        let response = request_client_credentials_token(
            &self.client,
            &self.token_url,
            credentials,
            self.timeout,
        )
        .await?;

        Ok(TokenGrant {
            access_token: response.access_token,
            expires_in: response.expires_in,
        })
    }
}
