use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn token_body(access_token: &str, refresh_token: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access_token,
        "client_id": "a",
        "expires_in": 21600,
        "token_type": "Bearer",
        "user_id": "user_1"
    });
    if let Some(rt) = refresh_token {
        body["refresh_token"] = rt.into();
    }
    body
}

/// Token endpoint answering an authorization-code grant for `code`. Client
/// credentials must arrive in the form body, never as basic auth.
#[allow(dead_code)]
pub async fn mount_code_exchange(server: &MockServer, code: &str, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={code}")))
        .and(body_string_contains("client_id=a"))
        .and(body_string_contains("client_secret=b"))
        .and(|req: &Request| !req.headers.contains_key("authorization"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body(access_token, Some("refresh-1"))),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Token endpoint answering a refresh grant for `refresh_token`, without
/// rotating the refresh token.
#[allow(dead_code)]
pub async fn mount_refresh(server: &MockServer, refresh_token: &str, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains(format!("refresh_token={refresh_token}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access_token, None)))
        .expect(1)
        .mount(server)
        .await;
}

/// `ping/whoami` that only answers to `access_token`.
#[allow(dead_code)]
pub async fn mount_whoami(server: &MockServer, access_token: &str) {
    Mock::given(method("GET"))
        .and(path("/ping/whoami"))
        .and(wiremock::matchers::header(
            "authorization",
            format!("Bearer {access_token}").as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "authenticated": true,
            "client_id": "a",
            "user_id": "user_1"
        })))
        .mount(server)
        .await;
}
