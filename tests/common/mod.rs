pub mod http_mock;

use std::net::TcpListener;

use mzutil::{AuthConfig, AuthorizationPrompt, ProviderConfig};
use tokio::sync::mpsc;

/// Hands the authorization URL to the test instead of a browser.
#[allow(dead_code)]
pub struct CapturePrompt {
    urls: mpsc::UnboundedSender<String>,
}

impl CapturePrompt {
    #[allow(dead_code)]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { urls: tx }, rx)
    }
}

impl AuthorizationPrompt for CapturePrompt {
    fn present(&self, auth_url: &str) {
        let _ = self.urls.send(auth_url.to_string());
    }
}

/// A loopback port that was free a moment ago.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Provider whose every endpoint lives on the mock server at `base`.
#[allow(dead_code)]
pub fn mock_provider(base: &str) -> ProviderConfig {
    ProviderConfig {
        name: "monzo".into(),
        auth_url: format!("{base}/authorize"),
        token_url: format!("{base}/oauth2/token"),
        api_url: base.to_string(),
        logout_url: format!("{base}/oauth2/logout"),
    }
}

#[allow(dead_code)]
pub fn auth_config(callback_url: &str) -> AuthConfig {
    AuthConfig {
        client_id: "a".into(),
        client_secret: "b".into(),
        callback_url: callback_url.into(),
    }
}

#[allow(dead_code)]
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let url = reqwest::Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
