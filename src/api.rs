use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::AuthorizedClient;
use crate::config::ProviderConfig;
use crate::error::MzutilError;
use crate::oauth::Authenticator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Minor units (pence).
    pub balance: i64,
    pub currency: String,
    #[serde(default)]
    pub spend_today: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<Account>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhoAmI {
    pub authenticated: bool,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub user_id: String,
}

/// Typed access to the banking API over an [`AuthorizedClient`].
#[derive(Debug, Clone)]
pub struct MonzoClient {
    http: AuthorizedClient,
    api_url: Url,
    logout_url: String,
}

impl MonzoClient {
    pub fn new(http: AuthorizedClient, provider: &ProviderConfig) -> Result<Self, MzutilError> {
        let mut base = provider.api_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_url = Url::parse(&base)
            .map_err(|e| MzutilError::BadConfig(format!("bad API URL '{base}': {e}")))?;
        Ok(Self {
            http,
            api_url,
            logout_url: provider.logout_url.clone(),
        })
    }

    pub fn from_authenticator(
        auth: &dyn Authenticator,
        provider: &ProviderConfig,
    ) -> Result<Self, MzutilError> {
        Self::new(auth.new_http_client()?, provider)
    }

    pub async fn balance(&self, account_id: &str) -> Result<Balance, MzutilError> {
        let mut url = self.endpoint("balance")?;
        url.query_pairs_mut().append_pair("account_id", account_id);
        self.get_json(url).await
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, MzutilError> {
        let url = self.endpoint("accounts")?;
        let resp: AccountsResponse = self.get_json(url).await?;
        Ok(resp.accounts)
    }

    pub async fn whoami(&self) -> Result<WhoAmI, MzutilError> {
        let url = self.endpoint("ping/whoami")?;
        self.get_json(url).await
    }

    /// Invalidate the current access token at the provider.
    pub async fn logout(&self) -> Result<(), MzutilError> {
        let resp = self.http.post_form(&self.logout_url, &[]).await?;
        check_status(resp).await?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, MzutilError> {
        self.api_url
            .join(path)
            .map_err(|e| MzutilError::BadConfig(format!("bad API path '{path}': {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, MzutilError> {
        tracing::debug!(%url, "GET");
        let resp = self.http.get(url.as_str()).await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }
}

/// Map unauthorized responses to `AuthError` and other failures to `Api`.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, MzutilError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    tracing::error!(status = status.as_u16(), url = %resp.url(), "request error");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(MzutilError::AuthError(format!("API returned {status}")))
        }
        _ => {
            let body = resp.text().await.unwrap_or_default();
            Err(MzutilError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_deserialization() {
        let json = r#"{"balance":5000,"total_balance":6000,"currency":"GBP","spend_today":-120}"#;
        let balance: Balance = serde_json::from_str(json).unwrap();
        assert_eq!(balance.balance, 5000);
        assert_eq!(balance.currency, "GBP");
        assert_eq!(balance.spend_today, -120);
    }

    #[test]
    fn accounts_deserialization() {
        let json = r#"{"accounts":[{"id":"acc_00009237aqC8c5umZmrRdh","description":"Peter Pan's Account","created":"2015-11-13T12:17:42.102Z"}]}"#;
        let resp: AccountsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.accounts.len(), 1);
        assert_eq!(resp.accounts[0].id, "acc_00009237aqC8c5umZmrRdh");
        assert_eq!(resp.accounts[0].description, "Peter Pan's Account");
        assert!(!resp.accounts[0].closed);
    }

    #[test]
    fn whoami_deserialization() {
        let json = r#"{"authenticated":true,"client_id":"oauthclient_1","user_id":"user_1"}"#;
        let who: WhoAmI = serde_json::from_str(json).unwrap();
        assert!(who.authenticated);
        assert_eq!(who.user_id, "user_1");
    }
}
