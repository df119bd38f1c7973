use crate::error::MzutilError;
use crate::oauth::token::Token;
use crate::store::{SecretStore, SecretStoreExt};

const TOKEN_KEY_PREFIX: &str = "oauth_token:";

/// Secret store key holding the cached token for `provider`.
pub fn token_key(provider: &str) -> String {
    format!("{TOKEN_KEY_PREFIX}{provider}")
}

/// Load the persisted token for `provider`, or `None` if there is none or it
/// cannot be read.
pub fn fetch_token(store: &dyn SecretStore, provider: &str) -> Option<Token> {
    match store.read_value::<Token>(&token_key(provider)) {
        Ok(token) => Some(token),
        Err(MzutilError::NotFound(_)) => {
            tracing::debug!(provider, "No persisted OAuth token");
            None
        }
        Err(e) => {
            tracing::warn!(provider, "Could not load token from {store}: {e}");
            None
        }
    }
}

pub fn persist_token(store: &dyn SecretStore, provider: &str, token: &Token) -> Result<(), MzutilError> {
    store.write_value(&token_key(provider), token)
}

pub fn forget_token(store: &dyn SecretStore, provider: &str) -> Result<(), MzutilError> {
    store.delete(&token_key(provider))
}
