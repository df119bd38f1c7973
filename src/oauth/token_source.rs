use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::MzutilError;
use crate::oauth::cache::{fetch_token, persist_token};
use crate::oauth::token::{Token, TokenEndpoint};
use crate::store::SecretStore;

/// Anything that can hand out a currently usable token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Token, MzutilError>;
}

/// Obtains a fresh token to replace `current`, which may be absent or expired.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, current: Option<&Token>) -> Result<Token, MzutilError>;
}

#[async_trait]
impl TokenRefresher for TokenEndpoint {
    async fn refresh(&self, current: Option<&Token>) -> Result<Token, MzutilError> {
        let refresh_token = current
            .and_then(|t| t.refresh_token.as_deref())
            .filter(|rt| !rt.is_empty())
            .ok_or_else(|| {
                MzutilError::AuthError("token expired and no refresh token is available".into())
            })?;
        self.exchange_refresh_token(refresh_token).await
    }
}

/// Token source that reuses a valid token, and otherwise refreshes it and
/// writes the result through to the secret store.
///
/// The validity check and the refresh happen under one lock, so overlapping
/// callers trigger at most one refresh.
pub struct CachedTokenSource {
    provider: String,
    store: Arc<dyn SecretStore>,
    refresher: Arc<dyn TokenRefresher>,
    token: Mutex<Option<Token>>,
}

impl std::fmt::Debug for CachedTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTokenSource")
            .field("provider", &self.provider)
            .field("store", &self.store.to_string())
            .finish_non_exhaustive()
    }
}

impl CachedTokenSource {
    pub fn new(
        provider: &str,
        store: Arc<dyn SecretStore>,
        initial: Option<Token>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            provider: provider.to_string(),
            store,
            refresher,
            token: Mutex::new(initial),
        }
    }

    /// Start from whatever token is persisted for `provider`. A missing or
    /// unreadable token just forces a refresh on first use.
    pub fn load(provider: &str, store: Arc<dyn SecretStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        let initial = fetch_token(store.as_ref(), provider);
        Self::new(provider, store, initial, refresher)
    }
}

#[async_trait]
impl TokenSource for CachedTokenSource {
    async fn token(&self) -> Result<Token, MzutilError> {
        let mut held = self.token.lock().await;
        if let Some(token) = held.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.clone());
        }

        tracing::debug!(provider = %self.provider, "Refreshing OAuth token");
        let mut fresh = self.refresher.refresh(held.as_ref()).await?;
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = held.as_ref().and_then(|t| t.refresh_token.clone());
        }

        if let Err(e) = persist_token(self.store.as_ref(), &self.provider, &fresh) {
            tracing::warn!(provider = %self.provider, "Could not persist OAuth token: {e}");
        }

        *held = Some(fresh.clone());
        Ok(fresh)
    }
}
