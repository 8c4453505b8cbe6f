//! Token refresh behaviour of the Portal HTTP client

use futures::future::join_all;
use portal_core::{KeyValueStore, MemoryStore, TokenPair, keys};
use portal_http::client::{PROFILE_PATH, REFRESH_PATH};
use portal_http::{ApiClient, ApiRequest, AuthEvent, ClientError, RefreshFailure};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn profile_body() -> Value {
    json!({
        "data": {
            "_id": "u1",
            "email": "a@b.com",
            "username": "seller1",
            "phone": "0900000000",
            "role": "seller"
        }
    })
}

fn refresh_body(access: &str, refresh: &str) -> Value {
    json!({ "token": { "accessToken": access, "refreshToken": refresh } })
}

fn client_with_tokens(server: &MockServer, access: &str, refresh: &str) -> (ApiClient, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let client = ApiClient::builder()
        .base_url(server.uri())
        .storage(storage.clone())
        .build()
        .unwrap();
    client.tokens().save(&TokenPair::new(access, refresh)).unwrap();
    (client, storage)
}

async fn mount_profile(server: &MockServer, token: &str, status: u16) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(profile_body())
    } else {
        ResponseTemplate::new(status).set_body_json(json!({ "message": "jwt expired" }))
    };
    Mock::given(method("POST"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_retried() {
    let mock_server = MockServer::start().await;
    mount_profile(&mock_server, "expired", 401).await;
    mount_profile(&mock_server, "fresh", 200).await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_partial_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("fresh", "refresh-2")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, storage) = client_with_tokens(&mock_server, "expired", "refresh-1");
    let mut events = client.events().subscribe();

    let user = client.profile().await.unwrap();

    assert_eq!(user.email, "a@b.com");
    assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("fresh"));
    assert_eq!(storage.get(keys::REFRESH_TOKEN).unwrap().as_deref(), Some("refresh-2"));
    assert_eq!(events.try_recv().unwrap(), AuthEvent::TokensRefreshed);
    assert!(!client.refresh_in_flight());
}

#[tokio::test]
async fn test_refresh_carries_client_id_without_bearer() {
    let mock_server = MockServer::start().await;
    mount_profile(&mock_server, "expired", 401).await;
    mount_profile(&mock_server, "fresh", 200).await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("fresh", "refresh-2")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _storage) = client_with_tokens(&mock_server, "expired", "refresh-1");
    client.profile().await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let refresh = requests
        .iter()
        .find(|r| r.url.path() == REFRESH_PATH)
        .unwrap();
    assert!(!refresh.headers.contains_key("authorization"));
    let body: Value = refresh.body_json().unwrap();
    assert_eq!(body["clientId"], client.identity().get_client_id().unwrap());
}

#[tokio::test]
async fn test_retry_happens_only_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("fresh", "refresh-2")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _storage) = client_with_tokens(&mock_server, "expired", "refresh-1");
    let err = client.profile().await.unwrap_err();

    assert!(matches!(err, ClientError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_concurrent_401s_share_a_single_refresh() {
    let mock_server = MockServer::start().await;
    mount_profile(&mock_server, "expired", 401).await;
    mount_profile(&mock_server, "fresh", 200).await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(refresh_body("fresh", "refresh-2"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _storage) = client_with_tokens(&mock_server, "expired", "refresh-1");
    let mut events = client.events().subscribe();

    let calls = (0..5).map(|_| {
        let client = client.clone();
        async move { client.profile().await }
    });
    let results = join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap().id, "u1");
    }
    assert_eq!(events.try_recv().unwrap(), AuthEvent::TokensRefreshed);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_refresh_endpoint_never_refreshes_itself() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, storage) = client_with_tokens(&mock_server, "expired", "refresh-1");
    let response = client.send(&ApiRequest::post(REFRESH_PATH)).await.unwrap();

    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("expired"));
}

#[tokio::test]
async fn test_missing_refresh_token_ends_session() {
    let mock_server = MockServer::start().await;
    mount_profile(&mock_server, "expired", 401).await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let storage = Arc::new(MemoryStore::new());
    storage.set(keys::ACCESS_TOKEN, "expired").unwrap();
    let client = ApiClient::builder()
        .base_url(mock_server.uri())
        .storage(storage.clone())
        .build()
        .unwrap();
    let mut events = client.events().subscribe();

    let err = client.profile().await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::RefreshFailed(RefreshFailure::MissingRefreshToken)
    ));
    assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap(), None);
    assert_eq!(events.try_recv().unwrap(), AuthEvent::LoginRequired);
}

#[tokio::test]
async fn test_rejected_refresh_fails_every_waiter() {
    let mock_server = MockServer::start().await;
    mount_profile(&mock_server, "expired", 401).await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "refresh token expired" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, storage) = client_with_tokens(&mock_server, "expired", "refresh-1");
    let mut events = client.events().subscribe();

    let calls = (0..3).map(|_| {
        let client = client.clone();
        async move { client.profile().await }
    });
    let results = join_all(calls).await;

    for result in results {
        assert!(matches!(result, Err(ClientError::RefreshFailed(_))));
    }
    assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap(), None);
    assert_eq!(storage.get(keys::REFRESH_TOKEN).unwrap(), None);
    assert_eq!(events.try_recv().unwrap(), AuthEvent::LoginRequired);
    assert!(!client.refresh_in_flight());
}

#[tokio::test]
async fn test_queued_requests_fail_after_one_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
        .expect(3)
        .mount(&mock_server)
        .await;

    // The refreshed token is rejected too
    Mock::given(method("POST"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "user disabled" })))
        .expect(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(refresh_body("fresh", "refresh-2"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, storage) = client_with_tokens(&mock_server, "expired", "refresh-1");

    let calls = (0..3).map(|_| {
        let client = client.clone();
        async move { client.profile().await }
    });
    let results = join_all(calls).await;

    for result in results {
        assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
    }
    // A rejected replay is reported, not treated as a refresh failure
    assert_eq!(storage.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("fresh"));
    assert!(!client.refresh_in_flight());
}

#[tokio::test]
async fn test_late_401_reuses_token_refreshed_meanwhile() {
    let mock_server = MockServer::start().await;

    // Slow request: its 401 arrives after the refresh has settled
    Mock::given(method("POST"))
        .and(path(PROFILE_PATH))
        .and(header("authorization", "Bearer expired"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "jwt expired" }))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_profile(&mock_server, "fresh", 200).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/ping"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ping"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(refresh_body("fresh", "refresh-2")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _storage) = client_with_tokens(&mock_server, "expired", "refresh-1");
    let mut events = client.events().subscribe();

    let ping = ApiRequest::get("/api/v1/ping");
    let (profile, ping) = tokio::join!(client.profile(), client.send(&ping));

    assert_eq!(ping.unwrap().status().as_u16(), 204);
    assert_eq!(profile.unwrap().id, "u1");
    assert_eq!(events.try_recv().unwrap(), AuthEvent::TokensRefreshed);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}
