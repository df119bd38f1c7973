use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mzutil::oauth::{fetch_token, persist_token};
use mzutil::{
    Authenticator, AuthorizedClient, MemoryStore, MonzoAuthenticator, MonzoClient, MzutilError,
    SecretStore, Token, TokenSource,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

struct FixedToken;

#[async_trait]
impl TokenSource for FixedToken {
    async fn token(&self) -> Result<Token, MzutilError> {
        Ok(Token {
            access_token: "fixed".into(),
            refresh_token: None,
            token_type: "Bearer".into(),
            expiry: None,
        })
    }
}

/// Authenticator that always hands out the same bearer token.
struct FixedAuthenticator;

#[async_trait]
impl Authenticator for FixedAuthenticator {
    async fn login(&self) -> Result<(), MzutilError> {
        Ok(())
    }

    fn new_http_client(&self) -> Result<AuthorizedClient, MzutilError> {
        Ok(AuthorizedClient::new(Arc::new(FixedToken)))
    }
}

fn client_for(server: &MockServer) -> MonzoClient {
    MonzoClient::from_authenticator(&FixedAuthenticator, &common::mock_provider(&server.uri()))
        .unwrap()
}

#[tokio::test]
async fn balance_for_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/balance"))
        .and(query_param("account_id", "acc_1"))
        .and(header("authorization", "Bearer fixed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "balance": 12345,
            "total_balance": 12345,
            "currency": "GBP",
            "spend_today": -500
        })))
        .expect(1)
        .mount(&server)
        .await;

    let balance = client_for(&server).balance("acc_1").await.unwrap();
    assert_eq!(balance.balance, 12345);
    assert_eq!(balance.currency, "GBP");
    assert_eq!(balance.spend_today, -500);
}

#[tokio::test]
async fn accounts_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accounts": [
                {"id": "acc_1", "description": "Current", "created": "2015-11-13T12:17:42.102Z"},
                {"id": "acc_2", "description": "Joint", "created": "2017-02-01T09:00:00Z", "closed": true}
            ]
        })))
        .mount(&server)
        .await;

    let accounts = client_for(&server).accounts().await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].id, "acc_1");
    assert!(accounts[1].closed);
}

#[tokio::test]
async fn whoami_identity() {
    let server = MockServer::start().await;
    common::http_mock::mount_whoami(&server, "fixed").await;

    let who = client_for(&server).whoami().await.unwrap();
    assert!(who.authenticated);
    assert_eq!(who.client_id, "a");
}

#[tokio::test]
async fn unauthorized_and_forbidden_are_auth_errors() {
    for status in [401u16, 403] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accounts"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let err = client_for(&server).accounts().await.unwrap_err();
        assert_eq!(err.code(), "auth_error", "status {status}");
        assert_eq!(err.exit_code(), 3);
    }
}

#[tokio::test]
async fn server_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping/whoami"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server).whoami().await.unwrap_err();
    match err {
        MzutilError::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn logout_posts_to_logout_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/logout"))
        .and(header("authorization", "Bearer fixed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).logout().await.unwrap();
}

fn authenticator_over(server: &MockServer, store: Arc<dyn SecretStore>) -> MonzoAuthenticator {
    let (prompt, _urls) = common::CapturePrompt::new();
    MonzoAuthenticator::new(
        common::mock_provider(&server.uri()),
        common::auth_config("http://127.0.0.1:10035/cb"),
        store,
        Arc::new(prompt),
    )
}

fn expired_token() -> Token {
    Token {
        access_token: "stale".into(),
        refresh_token: Some("r1".into()),
        token_type: "Bearer".into(),
        expiry: Some(Utc::now() - Duration::hours(1)),
    }
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    common::http_mock::mount_refresh(&server, "r1", "access-2").await;
    common::http_mock::mount_whoami(&server, "access-2").await;

    let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
    persist_token(store.as_ref(), "monzo", &expired_token()).unwrap();

    let auth = authenticator_over(&server, store.clone());
    let client = MonzoClient::from_authenticator(&auth, &common::mock_provider(&server.uri()))
        .unwrap();
    client.whoami().await.unwrap();
    // Second call reuses the refreshed token; the refresh mock expects one hit.
    client.whoami().await.unwrap();

    let token = fetch_token(store.as_ref(), "monzo").unwrap();
    assert_eq!(token.access_token, "access-2");
    assert_eq!(token.refresh_token.as_deref(), Some("r1"));
    assert!(token.is_valid());
}

#[tokio::test]
async fn rejected_refresh_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
    persist_token(store.as_ref(), "monzo", &expired_token()).unwrap();

    let client = MonzoClient::from_authenticator(
        &authenticator_over(&server, store.clone()),
        &common::mock_provider(&server.uri()),
    )
    .unwrap();
    let err = client.accounts().await.unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert_eq!(fetch_token(store.as_ref(), "monzo").unwrap().access_token, "stale");
}

#[tokio::test]
async fn missing_token_is_auth_error_without_network() {
    let server = MockServer::start().await;
    let store: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());

    let client = MonzoClient::from_authenticator(
        &authenticator_over(&server, store),
        &common::mock_provider(&server.uri()),
    )
    .unwrap();
    let err = client.whoami().await.unwrap_err();
    assert_eq!(err.code(), "auth_error");
    assert!(server.received_requests().await.unwrap().is_empty());
}
