//! End-to-end session flows against a mock backend.
//!
//! These drive the full stack: builder, reqwest transport, session
//! core, persistence, and the refresh-and-retry pipeline.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use http::Method;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use berth_auth::Credential;
use berth_client::AppClient;
use berth_core::Request;

const APP_ID: &str = "integration-app";

fn encode_token(issued_at: i64, expires_at: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({"iat": issued_at, "exp": expires_at})
            .to_string()
            .as_bytes(),
    );
    format!("{header}.{payload}.sig")
}

fn login_response(user_id: &str, access_token: &str) -> serde_json::Value {
    json!({
        "user_id": user_id,
        "device_id": "device-1",
        "access_token": access_token,
        "refresh_token": "refresh-token-1",
    })
}

fn route(suffix: &str) -> String {
    format!("/api/client/v2.0/app/{APP_ID}{suffix}")
}

/// Mount permissive anonymous-login and profile mocks.
async fn mount_login(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path(route("/auth/providers/anon-user/login")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(login_response("user-1", access_token)),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route("/auth/profile")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "normal",
            "data": {"email": "ada@example.com"},
            "identities": [{"id": "ident-1", "provider_type": "anon-user"}],
        })))
        .mount(server)
        .await;
}

async fn client_for(server: &MockServer) -> AppClient {
    AppClient::builder(APP_ID, server.uri())
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn anonymous_login_exchanges_tokens_and_fetches_profile() {
    let server = MockServer::start().await;
    let now = Utc::now().timestamp();
    let access_token = encode_token(now - 10, now + 3_600);

    Mock::given(method("POST"))
        .and(path(route("/auth/providers/anon-user/login")))
        .and(body_partial_json(
            json!({"options": {"device": {"appId": APP_ID}}}),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(login_response("user-1", &access_token)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(route("/auth/profile")))
        .and(header("authorization", format!("Bearer {access_token}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "normal",
            "data": {"email": "ada@example.com"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let user = client
        .login_with_credential(&Credential::Anonymous)
        .await
        .unwrap();

    assert_eq!(user.id, "user-1");
    assert!(client.is_logged_in().await);

    let info = client.auth().auth_info().await;
    assert_eq!(info.device_id.as_deref(), Some("device-1"));
    assert_eq!(info.access_token.as_deref(), Some(access_token.as_str()));
    assert_eq!(
        info.user_profile.unwrap().attribute("email"),
        Some("ada@example.com")
    );
}

#[tokio::test]
async fn expired_access_token_refreshes_and_retries() {
    let server = MockServer::start().await;
    let now = Utc::now().timestamp();
    let stale_token = encode_token(now - 10, now + 3_600);
    mount_login(&server, &stale_token).await;

    let client = client_for(&server).await;
    let _ = client
        .login_with_credential(&Credential::Anonymous)
        .await
        .unwrap();

    let fresh_token = encode_token(now, now + 7_200);
    // First hit on the resource is rejected as an invalid session.
    Mock::given(method("GET"))
        .and(path(route("/widgets")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid session",
            "error_code": "InvalidSession",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // The pipeline refreshes with the refresh token...
    Mock::given(method("POST"))
        .and(path(route("/auth/session")))
        .and(header("authorization", "Bearer refresh-token-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": fresh_token})),
        )
        .expect(1)
        .mount(&server)
        .await;
    // ...and the retry goes out under the fresh access token.
    Mock::given(method("GET"))
        .and(path(route("/widgets")))
        .and(header("authorization", format!("Bearer {fresh_token}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"widgets": [1, 2, 3]})))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder(Method::GET, route("/widgets")).build();
    let response = client.authenticated_request(&request).await.unwrap();

    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["widgets"], json!([1, 2, 3]));
    assert_eq!(
        client.auth().auth_info().await.access_token.as_deref(),
        Some(fresh_token.as_str())
    );
}

#[tokio::test]
async fn revoked_refresh_token_forces_logout() {
    let server = MockServer::start().await;
    let now = Utc::now().timestamp();
    mount_login(&server, &encode_token(now - 10, now + 3_600)).await;

    let client = client_for(&server).await;
    let _ = client
        .login_with_credential(&Credential::Anonymous)
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path(route("/auth/session")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid session",
            "error_code": "InvalidSession",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = client.auth().refresh_access_token().await.unwrap_err();

    assert!(error.is_invalid_session());
    assert!(!client.is_logged_in().await);
    let info = client.auth().auth_info().await;
    assert_eq!(info.user_id, None);
    // The device id is the one thing a logout keeps.
    assert_eq!(info.device_id.as_deref(), Some("device-1"));
}

#[tokio::test]
async fn logout_invalidates_the_session_with_the_backend() {
    let server = MockServer::start().await;
    let now = Utc::now().timestamp();
    mount_login(&server, &encode_token(now - 10, now + 3_600)).await;

    let client = client_for(&server).await;
    let _ = client
        .login_with_credential(&Credential::Anonymous)
        .await
        .unwrap();

    Mock::given(method("DELETE"))
        .and(path(route("/auth/session")))
        .and(header("authorization", "Bearer refresh-token-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.logout().await.unwrap();

    assert!(!client.is_logged_in().await);
    assert!(client.current_user().await.is_none());
}

#[tokio::test]
async fn link_hits_the_flagged_login_route() {
    let server = MockServer::start().await;
    let now = Utc::now().timestamp();
    let access_token = encode_token(now - 10, now + 3_600);
    mount_login(&server, &access_token).await;

    let client = client_for(&server).await;
    let user = client
        .login_with_credential(&Credential::Anonymous)
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path(route("/auth/providers/local-userpass/login")))
        .and(query_param("link", "true"))
        .and(header("authorization", format!("Bearer {access_token}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(login_response("user-1", &access_token)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let linked = client
        .link_user_with_credential(
            &user,
            &Credential::UserPassword {
                username: "ada@example.com".to_string(),
                password: "hunter2".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(linked.id, "user-1");
    assert_eq!(
        linked.logged_in_provider_name, "local-userpass",
        "the linked provider becomes the logged-in provider"
    );
}
