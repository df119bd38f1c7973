use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MzutilError;
use crate::store::{FileStore, KeychainStore, SecretStore};

/// Secret store key holding the [`AuthConfig`] record.
pub const AUTH_CONFIG_KEY: &str = "auth_config";
/// Private directory under `$HOME` used by the file store.
pub const FILE_STORE_DIR: &str = ".mzutil";
/// Service name used for OS vault entries.
pub const KEYCHAIN_SERVICE: &str = "mzutil";
/// Default time to wait for the browser redirect.
pub const DEFAULT_OAUTH_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth client credentials registered with the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

impl AuthConfig {
    /// Secret shortened to its first and last five characters for display.
    pub fn masked_secret(&self) -> String {
        let secret = &self.client_secret;
        let chars: Vec<char> = secret.chars().collect();
        if chars.len() > 10 {
            let head: String = chars[..5].iter().collect();
            let tail: String = chars[chars.len() - 5..].iter().collect();
            format!("{head}...{tail}")
        } else {
            secret.clone()
        }
    }
}

/// Endpoints of the OAuth provider and its API.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Provider name; also selects the token's secret store key.
    pub name: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub logout_url: String,
}

impl ProviderConfig {
    pub fn monzo() -> Self {
        Self {
            name: "monzo".into(),
            auth_url: "https://auth.monzo.com/".into(),
            token_url: "https://api.monzo.com/oauth2/token".into(),
            api_url: "https://api.monzo.com/".into(),
            logout_url: "https://api.monzo.com/oauth2/logout".into(),
        }
    }

    /// Monzo defaults with `MZUTIL_AUTH_URL`, `MZUTIL_TOKEN_URL`,
    /// `MZUTIL_API_URL` and `MZUTIL_LOGOUT_URL` overrides applied.
    pub fn from_env() -> Self {
        let mut provider = Self::monzo();
        override_from_env(&mut provider.auth_url, "MZUTIL_AUTH_URL");
        override_from_env(&mut provider.token_url, "MZUTIL_TOKEN_URL");
        override_from_env(&mut provider.api_url, "MZUTIL_API_URL");
        override_from_env(&mut provider.logout_url, "MZUTIL_LOGOUT_URL");
        provider
    }
}

fn override_from_env(field: &mut String, var: &str) {
    if let Ok(val) = std::env::var(var) {
        if !val.is_empty() {
            *field = val;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// `~/.mzutil/<key>.json`
    File,
    /// OS credential vault
    Keychain,
}

/// Runtime settings assembled from CLI flags and the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StoreKind,
    pub provider: ProviderConfig,
    pub oauth_timeout: Duration,
    pub open_browser: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreKind::Keychain,
            provider: ProviderConfig::monzo(),
            oauth_timeout: DEFAULT_OAUTH_TIMEOUT,
            open_browser: true,
        }
    }
}

impl Settings {
    pub fn open_store(&self) -> Result<Arc<dyn SecretStore>, MzutilError> {
        let store: Arc<dyn SecretStore> = match self.store {
            StoreKind::File => Arc::new(FileStore::in_home(FILE_STORE_DIR)?),
            StoreKind::Keychain => Arc::new(KeychainStore::new(KEYCHAIN_SERVICE)),
        };
        Ok(store)
    }
}
