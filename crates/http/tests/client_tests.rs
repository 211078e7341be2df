//! Integration tests for the Kuteera HTTP client

use kuteera_core::{KeyValueStore, MemoryStore, Role, keys};
use kuteera_http::types::{AddressType, CustomerRegistration};
use kuteera_http::{ClientError, KuteeraClient};
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn admin_body() -> serde_json::Value {
    json!({
        "admin_id": 1,
        "customer_id": 7,
        "phone": "9876543210",
        "role": "admin",
        "name": "Asha"
    })
}

fn client_with(server: &MockServer, entries: &[(&str, &str)]) -> (KuteeraClient, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_entries(entries.iter().copied()));
    let client = KuteeraClient::builder()
        .base_url(format!("{}/", server.uri()))
        .store(store.clone())
        .build()
        .unwrap();
    (client, store)
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = KuteeraClient::builder()
        .store(Arc::new(MemoryStore::new()))
        .build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_client_builder_requires_store() {
    let result = KuteeraClient::builder().base_url("http://localhost:3000").build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/backend/auth/me"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(admin_body()))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, &[(keys::ACCESS_TOKEN, "access-1")]);
    assert_eq!(client.base_url(), server.uri());

    let me = client.me().await.unwrap();
    assert_eq!(me.role, Role::Admin);
    assert_eq!(me.name.as_deref(), Some("Asha"));
}

#[tokio::test]
async fn test_no_authorization_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/backend/auth/me"))
        .and(|req: &Request| !req.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(admin_body()))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, &[]);
    assert!(client.me().await.is_ok());
}

#[tokio::test]
async fn test_caller_authorization_is_not_overridden() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/backend/orders"))
        .and(header("authorization", "Bearer caller-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, &[(keys::ACCESS_TOKEN, "stored-token")]);
    let request = client
        .backend(Method::GET, "/orders")
        .header("authorization", "Bearer caller-token");
    let orders: Vec<serde_json::Value> = client.execute(request).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_replays_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/backend/auth/me"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/backend/auth/refresh"))
        .and(header("authorization", "Bearer refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/backend/auth/me"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(admin_body()))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with(
        &server,
        &[(keys::ACCESS_TOKEN, "stale"), (keys::REFRESH_TOKEN, "refresh-1")],
    );

    let me = client.me().await.unwrap();
    assert!(me.is_admin());
    assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_replay_never_triggers_second_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/backend/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/backend/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(
        &server,
        &[(keys::ACCESS_TOKEN, "stale"), (keys::REFRESH_TOKEN, "refresh-1")],
    );

    let response = client
        .send(client.backend(Method::GET, "/auth/me"))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_failed_refresh_returns_original_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/backend/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_string("original"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/backend/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid refresh token"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with(
        &server,
        &[(keys::ACCESS_TOKEN, "stale"), (keys::REFRESH_TOKEN, "revoked")],
    );

    let result = client.me().await;
    match result {
        Err(ClientError::AuthenticationFailed(message)) => assert_eq!(message, "original"),
        other => panic!("expected authentication failure, got {other:?}"),
    }
    assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("stale"));
}

#[tokio::test]
async fn test_no_refresh_token_skips_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/backend/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/backend/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, &[(keys::ACCESS_TOKEN, "stale")]);
    assert!(client.me().await.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn test_me_with_cookie_forwards_cookie_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/backend/auth/me"))
        .and(header("cookie", "access_token=abc"))
        .and(|req: &Request| !req.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(admin_body()))
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, &[(keys::ACCESS_TOKEN, "stored")]);
    let me = client.me_with_cookie("access_token=abc").await.unwrap();
    assert!(me.unwrap().is_admin());

    let none = client.me_with_cookie("access_token=other").await.unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_login_persists_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/backend/api/login"))
        .and(body_json(json!({ "phone": "9876543210", "admin_password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Login successful",
            "is_admin": true,
            "is_admin_account": true,
            "user": admin_body(),
            "access_token": "access-9",
            "refresh_token": "refresh-9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with(&server, &[]);
    let response = client
        .login("9876543210", Some("secret".to_string()))
        .await
        .unwrap();

    assert!(response.is_admin);
    assert_eq!(response.user.unwrap().admin_id, Some(1));
    assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("access-9"));
    assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap().as_deref(), Some("refresh-9"));
}

#[tokio::test]
async fn test_logout_remote_posts_with_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/backend/auth/logout"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, &[(keys::ACCESS_TOKEN, "access-1")]);
    client.logout_remote().await.unwrap();
}

#[tokio::test]
async fn test_city_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get-city"))
        .and(query_param("phone", "9876543210"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "city": "Mysore", "is_admin": false })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get-city"))
        .and(query_param("phone", "9000000000"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "detail": "User does not exist. Please register." })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get-cities"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "cities": ["Mysore", "Bangalore"] })),
        )
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, &[]);
    assert_eq!(
        client.city_by_phone("9876543210").await.unwrap().as_deref(),
        Some("Mysore")
    );
    assert!(client.city_by_phone("9000000000").await.unwrap().is_none());
    assert_eq!(
        client.available_cities().await.unwrap(),
        vec!["Mysore".to_string(), "Bangalore".to_string()]
    );
}

#[tokio::test]
async fn test_register_customer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/register"))
        .and(|req: &Request| {
            serde_json::from_slice::<serde_json::Value>(&req.body)
                .is_ok_and(|body| body["primary_mobile"] == "9876543210" && body["city"] == "Mysore")
        })
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "customer_id": 42 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with(&server, &[]);
    let registration = CustomerRegistration {
        primary_mobile: "9876543210".into(),
        name: "Ravi".into(),
        recipient_name: "Ravi".into(),
        written_address: "12 Temple Road".into(),
        city: "Mysore".into(),
        pin_code: "570001".into(),
        address_type: Some(AddressType::Home),
        is_default: true,
        ..Default::default()
    };

    let response = client.register(&registration).await.unwrap();
    assert!(response.success);
    assert_eq!(response.customer_id, Some(42));

    let invalid = CustomerRegistration {
        primary_mobile: "123".into(),
        ..registration
    };
    assert!(matches!(
        client.register(&invalid).await,
        Err(ClientError::BadRequest(_))
    ));
}
