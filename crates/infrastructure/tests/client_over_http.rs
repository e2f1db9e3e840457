//! Transport and full client stack against a real HTTP server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tally_application::{
    ApiError, AuthenticatedClient, ClientOptions, CredentialStore, HttpTransport, Navigator,
    RefreshFailure, TransportError, handle_api_error,
};
use tally_domain::{ApiRequest, RequestErrorKind, Session, UserProfile, UserRole};
use tally_infrastructure::{FileCredentialStore, RedirectSignal, ReqwestTransport, TokioFileSystem};

type Client = AuthenticatedClient<ReqwestTransport>;

fn transport(server: &MockServer) -> ReqwestTransport {
    ReqwestTransport::new(&server.base_url(), Duration::from_secs(5), "tally-test").unwrap()
}

fn session() -> Session {
    Session::new(
        "stale",
        "refresh-1",
        UserProfile {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: UserRole::Admin,
        },
    )
    .unwrap()
}

struct Stack {
    _dir: tempfile::TempDir,
    store: Arc<FileCredentialStore<TokioFileSystem>>,
    signal: RedirectSignal,
    client: Arc<Client>,
}

async fn stack(server: &MockServer) -> Stack {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCredentialStore::new(
        TokioFileSystem::new(),
        dir.path().join("credentials.json"),
    ));
    store.save(&session()).await.unwrap();

    let signal = RedirectSignal::new();
    let client = Arc::new(AuthenticatedClient::new(
        transport(server),
        Arc::clone(&store) as Arc<dyn CredentialStore>,
        Arc::new(signal.clone()) as Arc<dyn Navigator>,
        ClientOptions::default(),
    ));

    Stack {
        _dir: dir,
        store,
        signal,
        client,
    }
}

#[tokio::test]
async fn test_transport_sends_query_headers_and_json_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/products")
                .query_param("dryRun", "true")
                .header("authorization", "Bearer abc")
                .json_body(json!({ "name": "Mug", "price": 9.5 }));
            then.status(201)
                .header("content-type", "application/json")
                .json_body(json!({ "success": true, "data": { "id": "p1" } }));
        })
        .await;

    let mut request = ApiRequest::post("/api/products")
        .with_query("dryRun", "true")
        .with_json(&json!({ "name": "Mug", "price": 9.5 }))
        .unwrap();
    request.set_bearer("abc");

    let response = transport(&server).execute(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.status, 201);
    assert_eq!(response.status_text, "Created");
    assert_eq!(response.headers.get("content-type"), Some("application/json"));
    let created: Value = response.json().unwrap();
    assert_eq!(created, json!({ "id": "p1" }));
}

#[tokio::test]
async fn test_error_statuses_are_responses() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/orders/404");
            then.status(404)
                .json_body(json!({ "success": false, "message": "Order not found" }));
        })
        .await;

    let response = transport(&server)
        .execute(&ApiRequest::get("/api/orders/404"))
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(
        response.error_payload().map(|p| p.message).as_deref(),
        Some("Order not found")
    );
}

#[tokio::test]
async fn test_request_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/slow");
            then.status(200).delay(Duration::from_millis(500));
        })
        .await;

    let request = ApiRequest::get("/slow").with_timeout(Duration::from_millis(50));
    let err = transport(&server).execute(&request).await.unwrap_err();

    assert_eq!(err, TransportError::Timeout { timeout_ms: 50 });
}

#[tokio::test]
async fn test_unreachable_server() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let transport = ReqwestTransport::new(
        &format!("http://127.0.0.1:{port}"),
        Duration::from_secs(2),
        "tally-test",
    )
    .unwrap();

    let err = transport.execute(&ApiRequest::get("/")).await.unwrap_err();

    assert!(
        matches!(
            err,
            TransportError::ConnectionRefused { .. } | TransportError::ConnectionFailed(_)
        ),
        "unexpected error: {err:?}"
    );
    let message = handle_api_error(&ApiError::Transport(err));
    assert_eq!(
        message,
        RequestErrorKind::ConnectionRefused.user_message()
    );
}

#[tokio::test]
async fn test_expired_token_refreshes_and_persists() {
    let server = MockServer::start_async().await;
    let stale = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/products")
                .header("authorization", "Bearer stale");
            then.status(401)
                .json_body(json!({ "success": false, "message": "Token expired" }));
        })
        .await;
    let refresh = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/auth/refresh-token")
                .json_body(json!({ "refreshToken": "refresh-1" }));
            then.status(200).json_body(json!({
                "success": true,
                "data": { "token": "fresh", "refreshToken": "refresh-2" }
            }));
        })
        .await;
    let fresh = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/products")
                .header("authorization", "Bearer fresh");
            then.status(200)
                .json_body(json!({ "success": true, "data": [{ "id": "p1" }] }));
        })
        .await;

    let s = stack(&server).await;
    let products: Vec<Value> = s.client.get_json("/api/products").await.unwrap();

    assert_eq!(products, vec![json!({ "id": "p1" })]);
    stale.assert_async().await;
    refresh.assert_async().await;
    fresh.assert_async().await;

    let stored = s.store.load().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh");
    assert_eq!(stored.refresh_token, "refresh-2");
    assert_eq!(s.signal.redirect_count(), 0);
}

#[tokio::test]
async fn test_invalid_refresh_token_clears_session_and_redirects() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/products");
            then.status(401)
                .json_body(json!({ "success": false, "message": "Token expired" }));
        })
        .await;
    let refresh = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/refresh-token");
            then.status(401)
                .json_body(json!({ "success": false, "message": "Invalid refresh token" }));
        })
        .await;

    let s = stack(&server).await;
    let err = s.client.send(ApiRequest::get("/api/products")).await.unwrap_err();

    refresh.assert_async().await;
    match &err {
        ApiError::Refresh(RefreshFailure::Rejected { status, message }) => {
            assert_eq!(*status, 401);
            assert_eq!(message.as_deref(), Some("Invalid refresh token"));
        }
        other => panic!("expected a rejected refresh, got {other:?}"),
    }
    assert_eq!(
        handle_api_error(&err),
        RequestErrorKind::SessionExpired.user_message()
    );
    assert!(s.store.load().await.unwrap().is_none());
    assert!(!s.store.path().exists());
    assert_eq!(s.signal.last_route().as_deref(), Some("/"));
    assert_eq!(s.signal.redirect_count(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/api/stock").header("authorization", "Bearer stale");
            then.status(401)
                .json_body(json!({ "success": false, "message": "Token expired" }));
        })
        .await;
    let refresh = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/refresh-token");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({ "token": "fresh", "refreshToken": "refresh-2" }));
        })
        .await;
    let fresh = server
        .mock_async(|when, then| {
            when.path("/api/stock").header("authorization", "Bearer fresh");
            then.status(200).json_body(json!({ "count": 3 }));
        })
        .await;

    let s = stack(&server).await;
    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let client = Arc::clone(&s.client);
            tokio::spawn(async move { client.get_json::<Value>("/api/stock").await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), json!({ "count": 3 }));
    }

    refresh.assert_hits_async(1).await;
    fresh.assert_hits_async(3).await;
    assert!(!s.client.is_refreshing());
}
