use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MzutilError;

/// Tokens are treated as expired this long before their stated expiry, to
/// absorb clock skew and request latency.
pub const EXPIRY_DELTA_SECS: i64 = 10;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// A token without an expiry never expires.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_DELTA_SECS) <= Utc::now(),
            None => false,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }
}

/// Raw token response from the provider's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: String,
}

impl TokenResponse {
    fn into_token(self) -> Token {
        let expiry = self
            .expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| Utc::now() + Duration::seconds(secs));
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expiry,
        }
    }
}

/// Client for the provider's token endpoint.
///
/// Client credentials always travel in the form body; the provider rejects
/// HTTP basic auth on this endpoint.
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl TokenEndpoint {
    pub fn new(token_url: &str, client_id: &str, client_secret: &str, redirect_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_url: redirect_url.to_string(),
        }
    }

    /// Exchange an authorization code for a token.
    pub async fn exchange_code(&self, code: &str) -> Result<Token, MzutilError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MzutilError::AuthExchangeFailed(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MzutilError::AuthExchangeFailed(format!(
                "token endpoint returned status {status}: {body}"
            )));
        }

        let token_resp: TokenResponse = resp.json().await.map_err(|e| {
            MzutilError::AuthExchangeFailed(format!("failed to parse token response: {e}"))
        })?;

        let token = token_resp.into_token();
        if !token.is_valid() {
            return Err(MzutilError::AuthExchangeFailed(
                "provider returned an invalid token".into(),
            ));
        }
        Ok(token)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<Token, MzutilError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MzutilError::Http(format!("Token refresh request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MzutilError::AuthError(format!(
                "token refresh rejected with status {status}: {body}"
            )));
        }

        let token_resp: TokenResponse = resp.json().await.map_err(|e| {
            MzutilError::Serialization(format!("Failed to parse refresh token response: {e}"))
        })?;

        let token = token_resp.into_token();
        if !token.is_valid() {
            return Err(MzutilError::AuthError(
                "token refresh returned an invalid token".into(),
            ));
        }
        Ok(token)
    }
}
