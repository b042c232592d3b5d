//! REST scenarios over the full route table, backed by the in-memory
//! vault behind the encryption decorator.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use lockbox_domain::config::CredentialPolicy;
use lockbox_storage::BlobStore;
use lockbox_vault::{Encrypted, Memory, VaultState, vault_router};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

// base64(RawStd) of "Hello, World!"
const HELLO_B64: &str = "SGVsbG8sIFdvcmxkIQ";

async fn app_with_lifespan(temp: &TempDir, lifespan: Duration) -> Router {
    let store = BlobStore::builder().root(temp.path().join("blobs")).connect().await.unwrap();
    let state = VaultState::new(
        Arc::new(Encrypted::new(Memory::new(lifespan, store))),
        CredentialPolicy::default(),
    );

    let (router, _api) = vault_router().split_for_parts();
    router.with_state(state)
}

async fn app(temp: &TempDir) -> Router {
    app_with_lifespan(temp, Duration::from_secs(3600)).await
}

fn credential_body(username: &str, password: &str) -> Body {
    Body::from(format!("{{\"username\": \"{username}\", \"password\": \"{password}\"}}"))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    (status, headers, body)
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).expect("response body is JSON")
}

async fn register(app: &Router, username: &str, password: &str) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(credential_body(username, password))
        .unwrap();
    send(app, request).await.0
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Option<String>) {
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(credential_body(username, password))
        .unwrap();
    let (status, headers, _) = send(app, request).await;
    let token = headers
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap().to_owned());
    (status, token)
}

async fn session(app: &Router) -> String {
    assert_eq!(register(app, "test", "qwerty").await, StatusCode::CREATED);
    let (status, token) = login(app, "test", "qwerty").await;
    assert_eq!(status, StatusCode::OK);
    token.expect("login must answer with a token header")
}

#[tokio::test]
async fn registration_and_login_flow() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp).await;

    assert_eq!(register(&app, "test", "qwerty").await, StatusCode::CREATED);
    assert_eq!(register(&app, "test", "qwerty").await, StatusCode::CONFLICT);

    let (status, token) = login(&app, "test", "qwerty").await;
    assert_eq!(status, StatusCode::OK);
    assert!(token.is_some());

    let (status, _) = login(&app, "test", "wrong!").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_and_short_credentials_are_rejected() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp).await;

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\": \"incomplete\"}"))
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);

    // Below the configured minimum lengths.
    assert_eq!(register(&app, "ab", "qwerty").await, StatusCode::BAD_REQUEST);
    assert_eq!(register(&app, "test", "short").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn piece_store_and_restore() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp).await;
    let token = session(&app).await;

    let request = Request::builder()
        .method("PUT")
        .uri("/vault/piece")
        .header(header::AUTHORIZATION, &token)
        .header("X-Password", "qwerty")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!("{{\"meta\": \"m\", \"content\": \"{HELLO_B64}\"}}")))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    let rid = json(&body)["rid"].as_i64().expect("rid in response");

    let request = Request::builder()
        .method("GET")
        .uri(format!("/vault/piece/{rid}"))
        .header(header::AUTHORIZATION, &token)
        .header("X-Password", "qwerty")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let value = json(&body);
    assert_eq!(value["meta"], "m");
    assert_eq!(value["content"], HELLO_B64);
}

#[tokio::test]
async fn blob_store_and_restore() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp).await;
    let token = session(&app).await;

    let request = Request::builder()
        .method("PUT")
        .uri("/vault/blob")
        .header(header::AUTHORIZATION, &token)
        .header("X-Password", "qwerty")
        .header("X-Meta", "m2")
        .body(Body::from("Hello, World!"))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    let rid = json(&body)["rid"].as_i64().expect("rid in response");

    let request = Request::builder()
        .method("GET")
        .uri(format!("/vault/blob/{rid}"))
        .header(header::AUTHORIZATION, &token)
        .header("X-Password", "qwerty")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("X-Meta").unwrap(), "m2");
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/octet-stream");
    assert_eq!(headers.get(header::CONTENT_DISPOSITION).unwrap(), "attachment");
    assert_eq!(body, b"Hello, World!");
}

#[tokio::test]
async fn listing_delete_and_not_found() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp).await;
    let token = session(&app).await;

    // One piece, one blob.
    let request = Request::builder()
        .method("PUT")
        .uri("/vault/piece")
        .header(header::AUTHORIZATION, &token)
        .header("X-Password", "qwerty")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!("{{\"meta\": \"m\", \"content\": \"{HELLO_B64}\"}}")))
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::CREATED);

    let request = Request::builder()
        .method("PUT")
        .uri("/vault/blob")
        .header(header::AUTHORIZATION, &token)
        .header("X-Password", "qwerty")
        .header("X-Meta", "m2")
        .body(Body::from("Hello, World!"))
        .unwrap();
    let (_, _, body) = send(&app, request).await;
    let blob_rid = json(&body)["rid"].as_i64().unwrap();

    // Both resources listed with their kind tags and plaintext metas.
    let request = Request::builder()
        .method("GET")
        .uri("/vault")
        .header(header::AUTHORIZATION, &token)
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    let mut entries = json(&body).as_array().unwrap().clone();
    entries.sort_by_key(|entry| entry["rid"].as_i64().unwrap());
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["meta"], "m");
    assert_eq!(entries[0]["type"], 1);
    assert_eq!(entries[1]["meta"], "m2");
    assert_eq!(entries[1]["type"], 2);

    // Delete the blob; it stops existing for every endpoint.
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/vault/{blob_rid}"))
        .header(header::AUTHORIZATION, &token)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::OK);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/vault/blob/{blob_rid}"))
        .header(header::AUTHORIZATION, &token)
        .header("X-Password", "qwerty")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("GET")
        .uri("/vault")
        .header(header::AUTHORIZATION, &token)
        .body(Body::empty())
        .unwrap();
    let (_, _, body) = send(&app, request).await;
    assert_eq!(json(&body).as_array().unwrap().len(), 1);

    let request = Request::builder()
        .method("DELETE")
        .uri("/vault/999")
        .header(header::AUTHORIZATION, &token)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("DELETE")
        .uri("/vault/not-a-number")
        .header(header::AUTHORIZATION, &token)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_headers_fail_fast() {
    let temp = TempDir::new().unwrap();
    let app = app(&temp).await;
    let token = session(&app).await;

    // No token at all.
    let request = Request::builder().method("GET").uri("/vault").body(Body::empty()).unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::UNAUTHORIZED);

    // Token, but no vault password.
    let request = Request::builder()
        .method("GET")
        .uri("/vault/piece/0")
        .header(header::AUTHORIZATION, &token)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);

    // Wrong vault password on a stored piece.
    let request = Request::builder()
        .method("PUT")
        .uri("/vault/piece")
        .header(header::AUTHORIZATION, &token)
        .header("X-Password", "not-qwerty")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!("{{\"meta\": \"m\", \"content\": \"{HELLO_B64}\"}}")))
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn short_lived_tokens_expire() {
    let temp = TempDir::new().unwrap();
    let app = app_with_lifespan(&temp, Duration::from_secs(1)).await;
    let token = session(&app).await;

    tokio::time::sleep(Duration::from_secs(2)).await;

    let request = Request::builder()
        .method("GET")
        .uri("/vault")
        .header(header::AUTHORIZATION, &token)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::UNAUTHORIZED);
}
