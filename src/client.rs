use std::sync::Arc;

use crate::error::MzutilError;
use crate::oauth::token_source::TokenSource;

/// HTTP client that attaches a current bearer token to every request.
#[derive(Clone)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedClient").finish_non_exhaustive()
    }
}

impl AuthorizedClient {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
        }
    }

    pub async fn get(&self, url: &str) -> Result<reqwest::Response, MzutilError> {
        let token = self.tokens.token().await?;
        Ok(self
            .http
            .get(url)
            .bearer_auth(&token.access_token)
            .send()
            .await?)
    }

    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, MzutilError> {
        let token = self.tokens.token().await?;
        Ok(self
            .http
            .post(url)
            .bearer_auth(&token.access_token)
            .form(form)
            .send()
            .await?)
    }
}
