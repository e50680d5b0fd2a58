//! OAuth credentials for calendar access.
//!
//! Only the long-lived refresh token is configured. Access tokens are minted
//! on demand and cached until shortly before they expire. Secrets never
//! appear in `Debug` output or logs.

use crate::error::CredentialError;
use chrono::{DateTime, Utc};
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use rootcause::Report;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Google OAuth token URL.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens expiring within this window are refreshed eagerly.
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Client registration plus the user's refresh token.
#[derive(Clone)]
pub struct OAuthCredentials {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Token endpoint.
    pub token_url: String,
}

impl OAuthCredentials {
    /// Creates credentials against Google's token endpoint.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Overrides the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Checks that every field is present.
    ///
    /// # Errors
    ///
    /// Returns the first empty field.
    pub fn validate(&self) -> Result<(), CredentialError> {
        for (field, value) in [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("refresh_token", &self.refresh_token),
        ] {
            if value.trim().is_empty() {
                return Err(CredentialError::Missing { field });
            }
        }
        TokenUrl::new(self.token_url.clone()).map_err(|e| CredentialError::InvalidUrl {
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// A short-lived bearer token.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates a token that expires `expires_in` from `now`.
    #[must_use]
    pub fn new(secret: impl Into<String>, now: DateTime<Utc>, expires_in: Option<Duration>) -> Self {
        let expires_at = expires_in
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| now + d);
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// Returns the bearer value.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns true if the token is expired or expires within five minutes.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires| expires < now + chrono::Duration::minutes(REFRESH_MARGIN_MINUTES))
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Hands out access tokens, refreshing them when needed.
#[derive(Debug)]
pub struct TokenSource {
    credentials: OAuthCredentials,
    http: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenSource {
    /// Creates a token source.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are incomplete or the HTTP client
    /// cannot be built.
    pub fn new(credentials: OAuthCredentials) -> Result<Self, Report<CredentialError>> {
        credentials.validate()?;

        // The token endpoint must not be followed through redirects.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| CredentialError::RefreshFailed {
                reason: format!("HTTP client error: {e}"),
            })?;

        Ok(Self {
            credentials,
            http,
            cached: Mutex::new(None),
        })
    }

    /// Returns a valid access token, refreshing the cached one if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh request fails.
    pub async fn access_token(&self) -> Result<String, Report<CredentialError>> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && !token.needs_refresh(Utc::now())
        {
            return Ok(token.secret().to_string());
        }

        let token = self.refresh().await?;
        let secret = token.secret().to_string();
        *cached = Some(token);
        Ok(secret)
    }

    /// Drops the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    /// Seeds the cache, skipping the next refresh.
    pub async fn prime(&self, token: AccessToken) {
        *self.cached.lock().await = Some(token);
    }

    #[instrument(skip(self), fields(client_id = %self.credentials.client_id))]
    async fn refresh(&self) -> Result<AccessToken, CredentialError> {
        let token_url = TokenUrl::new(self.credentials.token_url.clone()).map_err(|e| {
            CredentialError::InvalidUrl {
                reason: e.to_string(),
            }
        })?;

        let client = BasicClient::new(ClientId::new(self.credentials.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.credentials.client_secret.clone()))
            .set_token_uri(token_url);

        let response = client
            .exchange_refresh_token(&RefreshToken::new(
                self.credentials.refresh_token.clone(),
            ))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                warn!(error = %e, "access token refresh failed");
                CredentialError::RefreshFailed {
                    reason: e.to_string(),
                }
            })?;

        let expires_in = response.expires_in();
        info!(
            expires_in_seconds = expires_in.map(|d| d.as_secs()),
            "refreshed calendar access token"
        );

        Ok(AccessToken::new(
            response.access_token().secret().clone(),
            Utc::now(),
            expires_in,
        ))
    }
}
