//! End-to-end checks against the full router with an in-memory database.

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

use timewarp_backend::{
    auth::SqliteUserStore,
    build_router,
    config::AppConfig,
    db::Database,
    feedback::mailer::{Mailer, OutgoingMail},
    middleware::RateLimitLayer,
    AppState,
};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        if self.fail {
            anyhow::bail!("smtp: connection refused");
        }
        self.sent.lock().push(mail);
        Ok(())
    }
}

struct TestApp {
    router: Router,
    db: Database,
    mailer: Arc<RecordingMailer>,
}

fn test_app(overrides: &[(&str, &str)], mailer: RecordingMailer) -> TestApp {
    let mut env: HashMap<String, String> = [
        ("JWT_SECRET", "integration-secret"),
        ("BCRYPT_COST", "4"),
        ("ADMIN_EMAIL", "admin@example.com"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        env.insert(k.to_string(), v.to_string());
    }
    let config = AppConfig::from_lookup(|key| env.get(key).cloned()).unwrap();

    let db = Database::in_memory().unwrap();
    let mailer = Arc::new(mailer);
    let state = AppState::new(
        &config,
        db.clone(),
        Arc::new(SqliteUserStore::new(db.clone())),
        mailer.clone(),
    );
    let limiter = RateLimitLayer::new(config.rate_limit.clone());

    TestApp {
        router: build_router(state, &config, limiter),
        db,
        mailer,
    }
}

fn default_app() -> TestApp {
    test_app(&[], RecordingMailer::default())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = auth {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap()
    };
    (status, value)
}

async fn register(router: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send_json(
        router,
        json_request(
            "POST",
            "/auth/register",
            json!({ "username": username, "password": password }),
        ),
    )
    .await
}

async fn login(router: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send_json(
        router,
        json_request(
            "POST",
            "/auth/login",
            json!({ "username": username, "password": password }),
        ),
    )
    .await
}

#[tokio::test]
async fn register_then_login_case_insensitive() {
    let app = default_app();

    let (status, body) = register(&app.router, "alice", "pw123").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"], json!({ "id": 1, "username": "alice" }));
    assert!(body["accessToken"].as_str().unwrap().split('.').count() == 3);

    let (status, body) = login(&app.router, "ALICE", "pw123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["accessToken"].is_string());
}

#[tokio::test]
async fn responses_never_leak_password_or_hash() {
    let app = default_app();

    let (_, registered) = send(
        &app.router,
        json_request(
            "POST",
            "/auth/register",
            json!({ "username": "bob", "password": "hunter2secret" }),
        ),
    )
    .await;
    let stored_hash: String = app
        .db
        .conn()
        .query_row("SELECT password_hash FROM users WHERE id = 1", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert!(stored_hash.starts_with("$2"));

    let token = serde_json::from_str::<Value>(&registered).unwrap()["accessToken"]
        .as_str()
        .unwrap()
        .to_string();
    let auth = format!("Bearer {token}");
    let (_, users) = send(&app.router, get("/users", Some(&auth))).await;
    let (_, user) = send(&app.router, get("/users/1", Some(&auth))).await;

    for body in [&registered, &users, &user] {
        assert!(!body.contains("hunter2secret"));
        assert!(!body.contains(&stored_hash));
        assert!(!body.contains("password"));
    }
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() {
    let app = default_app();
    register(&app.router, "alice", "pw123").await;

    let wrong = send(
        &app.router,
        json_request("POST", "/auth/login", json!({ "username": "alice", "password": "nope" })),
    )
    .await;
    let unknown = send(
        &app.router,
        json_request("POST", "/auth/login", json!({ "username": "ghost", "password": "nope" })),
    )
    .await;

    assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
    assert_eq!(wrong.1, r#"{"error":"Invalid credentials"}"#);
}

#[tokio::test]
async fn duplicate_username_conflicts_in_any_case() {
    let app = default_app();
    assert_eq!(register(&app.router, "alice", "pw123").await.0, StatusCode::CREATED);

    let (status, body) = register(&app.router, "Alice", "other").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({ "error": "Username already exists" }));
}

#[tokio::test]
async fn missing_fields_and_bad_json_are_400() {
    let app = default_app();

    let (status, body) = send_json(
        &app.router,
        json_request("POST", "/auth/register", json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password is required");

    let malformed = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\":"))
        .unwrap();
    let (status, body) = send_json(&app.router, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn protected_routes_in_presence_mode() {
    let app = default_app();
    register(&app.router, "alice", "pw123").await;

    let (status, body) = send_json(&app.router, get("/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));

    let (status, body) = send_json(&app.router, get("/users", Some("anything"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "users": [{ "id": 1, "username": "alice" }] }));

    let (status, body) = send_json(&app.router, get("/users/1", Some("anything"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");

    let (status, body) = send_json(&app.router, get("/users/abc", Some("anything"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid user ID");

    let (status, body) = send_json(&app.router, get("/users/42", Some("anything"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn protected_routes_in_verify_mode() {
    let app = test_app(&[("AUTH_VERIFY_TOKENS", "verify")], RecordingMailer::default());
    let (_, body) = register(&app.router, "alice", "pw123").await;
    let token = body["accessToken"].as_str().unwrap();

    let (status, _) = send(&app.router, get("/users", Some("anything"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.router, get("/users", Some("Bearer forged.token.here"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let auth = format!("Bearer {token}");
    let (status, _) = send(&app.router, get("/users", Some(&auth))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_user_requires_header_and_hides_hash() {
    let app = default_app();
    let body = json!({ "username": "carol", "password": "pw" });

    let (status, _) = send(&app.router, json_request("POST", "/users/create", body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = json_request("POST", "/users/create", body);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "admin".parse().unwrap());
    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({ "message": "User created successfully", "user": { "id": 1, "username": "carol" } })
    );

    let (status, _) = login(&app.router, "carol", "pw").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_user_with_verified_token() {
    let app = test_app(&[("AUTH_VERIFY_TOKENS", "verify")], RecordingMailer::default());
    let (_, body) = register(&app.router, "admin", "pw123").await;
    let auth = format!("Bearer {}", body["accessToken"].as_str().unwrap());

    let mut request = json_request(
        "POST",
        "/users/create",
        json!({ "username": "dave", "password": "pw" }),
    );
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, auth.parse().unwrap());
    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"], json!({ "id": 2, "username": "dave" }));
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let app = test_app(
        &[("RATE_LIMIT_MAX_REQUESTS", "3"), ("RATE_LIMIT_WINDOW_SECS", "60")],
        RecordingMailer::default(),
    );

    let from = |ip: &str| {
        let mut request = get("/api/destinations", None);
        let addr: SocketAddr = format!("{ip}:5000").parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    };

    for _ in 0..3 {
        let (status, _) = send(&app.router, from("10.1.1.1")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = app.router.clone().oneshot(from("10.1.1.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    let (status, _) = send(&app.router, from("10.2.2.2")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn feedback_is_validated_and_mailed() {
    let app = default_app();

    let (status, body) = send_json(
        &app.router,
        json_request(
            "POST",
            "/feedback",
            json!({ "name": "Ann", "email": "not-an-email", "message": "hi" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid email address");
    assert!(app.mailer.sent.lock().is_empty());

    let (status, body) = send_json(
        &app.router,
        json_request(
            "POST",
            "/feedback",
            json!({ "name": "Ann", "email": "ann@example.com", "message": "Loved Florence!" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let sent = app.mailer.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.to_string(), "admin@example.com");
    assert_eq!(sent[0].subject, "New message from Ann");
}

#[tokio::test]
async fn feedback_mailer_failure_is_generic_500() {
    let app = test_app(
        &[],
        RecordingMailer {
            fail: true,
            ..Default::default()
        },
    );

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/feedback",
            json!({ "name": "Ann", "email": "ann@example.com", "message": "hi" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"error":"Failed to send message"}"#);
    assert!(!body.contains("connection refused"));
}

#[tokio::test]
async fn seed_is_idempotent_and_feeds_destinations() {
    let app = default_app();

    let (status, body) = send_json(&app.router, get("/api/destinations", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let seed = || {
        Request::builder()
            .method("POST")
            .uri("/seed")
            .body(Body::empty())
            .unwrap()
    };
    let (status, body) = send(&app.router, seed()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (_, first) = send_json(&app.router, get("/api/destinations", None)).await;
    assert!(!first.as_array().unwrap().is_empty());
    assert_eq!(first[0]["id"], 1);
    assert!(first[0]["name"].is_string());

    assert_eq!(send(&app.router, seed()).await.0, StatusCode::NO_CONTENT);
    let (_, second) = send_json(&app.router, get("/api/destinations", None)).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn health_endpoints() {
    let app = default_app();

    let (status, body) = send_json(&app.router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "Database connection active" }));

    app.db
        .conn()
        .execute(
            "INSERT INTO timewarp (title, era, year) VALUES ('Moon landing', 'Space Age', 1969)",
            [],
        )
        .unwrap();
    let (status, body) = send_json(&app.router, get("/health/timewarp", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["title"], "Moon landing");
    assert_eq!(body[0]["year"], 1969);
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = default_app();
    let (status, body) = send_json(&app.router, get("/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not found" }));
}
