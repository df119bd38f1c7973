use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use crate::client::AuthorizedClient;
use crate::config::{AuthConfig, ProviderConfig, AUTH_CONFIG_KEY, DEFAULT_OAUTH_TIMEOUT};
use crate::error::MzutilError;
use crate::oauth::cache::persist_token;
use crate::oauth::callback::CallbackReceiver;
use crate::oauth::state::{generate_state, states_match};
use crate::oauth::token::TokenEndpoint;
use crate::oauth::token_source::CachedTokenSource;
use crate::store::{SecretStore, SecretStoreExt};

/// Login ceremony plus construction of authenticated HTTP clients.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run the full browser login and persist the resulting token.
    async fn login(&self) -> Result<(), MzutilError>;

    /// Client backed by the persisted token, refreshed as needed. Does not
    /// require a `login()` in the same process.
    fn new_http_client(&self) -> Result<AuthorizedClient, MzutilError>;
}

/// Shows the authorization URL to the user.
pub trait AuthorizationPrompt: Send + Sync {
    fn present(&self, auth_url: &str);
}

/// Prints the URL to stderr and, optionally, opens it in the default browser.
#[derive(Debug, Clone, Copy)]
pub struct BrowserPrompt {
    pub open_browser: bool,
}

impl AuthorizationPrompt for BrowserPrompt {
    fn present(&self, auth_url: &str) {
        eprintln!("Authenticate by visiting:\n{auth_url}");
        if self.open_browser && webbrowser::open(auth_url).is_err() {
            tracing::warn!("Could not open browser automatically");
        }
    }
}

/// Progress of one login attempt, reported when an attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    Idle,
    NonceGenerated,
    AwaitingCallback,
    CodeReceived,
    TokenExchanged,
    Persisted,
}

/// Authorization-code login against the configured provider.
pub struct MonzoAuthenticator {
    provider: ProviderConfig,
    config: AuthConfig,
    store: Arc<dyn SecretStore>,
    prompt: Arc<dyn AuthorizationPrompt>,
    callback_timeout: Duration,
}

impl MonzoAuthenticator {
    pub fn new(
        provider: ProviderConfig,
        config: AuthConfig,
        store: Arc<dyn SecretStore>,
        prompt: Arc<dyn AuthorizationPrompt>,
    ) -> Self {
        Self {
            provider,
            config,
            store,
            prompt,
            callback_timeout: DEFAULT_OAUTH_TIMEOUT,
        }
    }

    /// Build an authenticator from the [`AuthConfig`] saved in `store`.
    pub fn from_store(
        provider: ProviderConfig,
        store: Arc<dyn SecretStore>,
        prompt: Arc<dyn AuthorizationPrompt>,
    ) -> Result<Self, MzutilError> {
        let config: AuthConfig = store.read_value(AUTH_CONFIG_KEY)?;
        Ok(Self::new(provider, config, store, prompt))
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    fn token_endpoint(&self) -> TokenEndpoint {
        TokenEndpoint::new(
            &self.provider.token_url,
            &self.config.client_id,
            &self.config.client_secret,
            &self.config.callback_url,
        )
    }

    /// Parse the callback URL and check the client credentials.
    fn validate(&self) -> Result<Url, MzutilError> {
        let callback = Url::parse(&self.config.callback_url).map_err(|e| {
            MzutilError::BadConfig(format!("bad callback URL '{}': {e}", self.config.callback_url))
        })?;
        if callback.scheme() != "http" {
            return Err(MzutilError::BadConfig(
                "scheme for callback URL must be http".into(),
            ));
        }
        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(MzutilError::BadConfig("invalid client secret or id".into()));
        }
        Ok(callback)
    }

    fn authorization_url(&self, state: &str) -> Result<Url, MzutilError> {
        Url::parse_with_params(
            &self.provider.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| MzutilError::BadConfig(format!("bad authorization URL: {e}")))
    }

    async fn run_login(&self, phase: &mut LoginPhase) -> Result<(), MzutilError> {
        let callback = self.validate()?;

        let state = generate_state();
        *phase = LoginPhase::NonceGenerated;

        let auth_url = self.authorization_url(&state)?;
        let receiver = CallbackReceiver::bind(bind_addr(&callback), callback.path()).await?;
        self.prompt.present(auth_url.as_str());
        *phase = LoginPhase::AwaitingCallback;

        let payload = receiver.wait(self.callback_timeout).await?;
        *phase = LoginPhase::CodeReceived;

        if !states_match(&state, &payload.state) {
            return Err(MzutilError::CsrfMismatch);
        }

        let token = self.token_endpoint().exchange_code(&payload.code).await?;
        *phase = LoginPhase::TokenExchanged;
        tracing::info!(
            token_type = %token.token_type,
            expiry = ?token.expiry,
            "Got OAuth token"
        );

        persist_token(self.store.as_ref(), &self.provider.name, &token)?;
        *phase = LoginPhase::Persisted;
        Ok(())
    }
}

#[async_trait]
impl Authenticator for MonzoAuthenticator {
    async fn login(&self) -> Result<(), MzutilError> {
        let mut phase = LoginPhase::Idle;
        let result = self.run_login(&mut phase).await;
        match &result {
            Ok(()) => tracing::info!(provider = %self.provider.name, "Login complete"),
            Err(e) => tracing::warn!(provider = %self.provider.name, ?phase, "Login failed: {e}"),
        }
        result
    }

    fn new_http_client(&self) -> Result<AuthorizedClient, MzutilError> {
        let source = CachedTokenSource::load(
            &self.provider.name,
            self.store.clone(),
            Arc::new(self.token_endpoint()),
        );
        Ok(AuthorizedClient::new(Arc::new(source)))
    }
}

/// Listener address for a callback URL: its port (80 when absent), on the
/// loopback interface the host names when it is local and on all interfaces
/// otherwise.
fn bind_addr(callback: &Url) -> SocketAddr {
    let port = callback.port_or_known_default().unwrap_or(80);
    let host = callback
        .host_str()
        .unwrap_or_default()
        .trim_start_matches('[')
        .trim_end_matches(']');
    let ip = match host.parse::<IpAddr>() {
        Ok(ip) if ip.is_loopback() => ip,
        _ if host.eq_ignore_ascii_case("localhost") => IpAddr::V4(Ipv4Addr::LOCALHOST),
        _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, port)
}
