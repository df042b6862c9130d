use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use eventhub_server::auth::{issue_token, JwtKeys};
use eventhub_server::config::{Config, DEFAULT_ALLOWED_ORIGINS};
use eventhub_server::db::{AbstractDatabase, ReferenceDb};
use eventhub_server::models::{NewUser, Role, User};
use eventhub_server::routes::create_routes;
use eventhub_server::AppState;

const SECRET: &str = "integration-secret";

struct TestApp {
    app: Router,
    db: ReferenceDb,
    keys: JwtKeys,
}

struct Account {
    user: User,
    token: String,
}

impl TestApp {
    fn new() -> Self {
        let db = ReferenceDb::default();
        let config = Config {
            database_url: None,
            max_connections: 1,
            jwt_secret: SECRET.to_string(),
            port: 0,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
            production: false,
        };
        let state = AppState::new(Arc::new(db.clone()), SECRET);

        Self {
            app: create_routes(state, &config),
            db,
            keys: JwtKeys::new(SECRET.as_bytes()),
        }
    }

    async fn account(&self, username: &str, role: Role) -> Account {
        let user = User::new(
            NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                level: "beginner".to_string(),
                role,
            },
            "$argon2i$placeholder".to_string(),
        );
        self.db.insert_user(&user).await.unwrap();
        let token = issue_token(&self.keys, user.id, role, Duration::hours(1)).unwrap();
        Account { user, token }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create_event(&self, promoter: &Account, title: &str, city: &str) -> Uuid {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/event/newEvent",
                Some(&promoter.token),
                Some(json!({
                    "title": title,
                    "date": "2030-06-21T19:00:00Z",
                    "address": "12 quai Saint-Antoine",
                    "city": city,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }
}

#[tokio::test]
async fn health_check_responds() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn lyon_scenario_end_to_end() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let bob = app.account("bob", Role::Member).await;

    let event_id = app.create_event(&alice, "Jazz on the Saône", "Lyon").await;

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/event/{}/join", event_id),
            Some(&bob.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(Method::GET, "/api/event/event-list?city=Lyon", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    let summary = listed[0].as_object().unwrap();
    let mut keys: Vec<&str> = summary.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["city", "date", "id", "title"]);

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/event/{}/event-details", event_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let attendees = body["data"].as_array().unwrap();
    assert_eq!(attendees.len(), 1);
    assert_eq!(
        attendees[0]["user"],
        json!({ "username": "bob", "level": "beginner", "email": "bob@example.com" })
    );

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/event/{}", event_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .send(Method::GET, "/api/event/event-list?city=Lyon", None, None)
        .await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/event/{}", event_id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.db.attendance_count().await, 0);
}

#[tokio::test]
async fn joining_twice_creates_one_attendance() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let bob = app.account("bob", Role::Member).await;
    let event_id = app.create_event(&alice, "Board games", "Paris").await;
    let uri = format!("/api/event/{}/join", event_id);

    let (_, first) = app.send(Method::POST, &uri, Some(&bob.token), None).await;
    let (status, second) = app.send(Method::POST, &uri, Some(&bob.token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["newly_joined"], true);
    assert_eq!(second["data"]["newly_joined"], false);
    assert_eq!(app.db.attendance_count().await, 1);
}

#[tokio::test]
async fn leaving_an_event_not_joined_is_a_no_op() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let bob = app.account("bob", Role::Member).await;
    let carol = app.account("carol", Role::Member).await;
    let event_id = app.create_event(&alice, "Board games", "Paris").await;
    app.send(
        Method::POST,
        &format!("/api/event/{}/join", event_id),
        Some(&bob.token),
        None,
    )
    .await;

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/event/{}/leave", event_id),
            Some(&carol.token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.db.attendance_count().await, 1);
}

#[tokio::test]
async fn unfiltered_listing_includes_finished_events() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let open = app.create_event(&alice, "Open mic", "Paris").await;
    let closed = app.create_event(&alice, "Closed mic", "Paris").await;
    app.send(
        Method::PATCH,
        &format!("/api/event/{}", closed),
        Some(&alice.token),
        None,
    )
    .await;

    let (_, filtered) = app
        .send(Method::GET, "/api/event/event-list?city=Paris", None, None)
        .await;
    let filtered = filtered["data"].as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["id"], open.to_string());

    let (_, all) = app.send(Method::GET, "/api/event/event-list", None, None).await;
    let all = all["data"].as_array().unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|e| e["is_finished"] == true));
}

#[tokio::test]
async fn strangers_cannot_manage_events() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let mallory = app.account("mallory", Role::Member).await;
    let event_id = app.create_event(&alice, "Picnic", "Nantes").await;

    let update = app
        .send(
            Method::PATCH,
            &format!("/api/event/{}/update-event", event_id),
            Some(&mallory.token),
            Some(json!({ "title": "Hijacked" })),
        )
        .await;
    let close = app
        .send(
            Method::PATCH,
            &format!("/api/event/{}", event_id),
            Some(&mallory.token),
            None,
        )
        .await;
    let delete = app
        .send(
            Method::DELETE,
            &format!("/api/event/{}", event_id),
            Some(&mallory.token),
            None,
        )
        .await;

    for (status, body) in [update, close, delete] {
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    let event = app.db.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.title, "Picnic");
    assert!(!event.is_finished);
}

#[tokio::test]
async fn admins_can_manage_any_event() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let admin = app.account("root", Role::Admin).await;
    let event_id = app.create_event(&alice, "Picnic", "Nantes").await;

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/event/{}/update-event", event_id),
            Some(&admin.token),
            Some(json!({ "title": "Picnic (moved)", "date": "2031-01-01T10:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Picnic (moved)");
    assert_eq!(body["data"]["city"], "Nantes");

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/event/{}", event_id),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.db.fetch_event(event_id).await.unwrap().is_none());
}

#[tokio::test]
async fn anonymous_callers_are_rejected_before_the_store() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/event/newEvent",
            None,
            Some(json!({
                "title": "Ghost",
                "date": "2030-01-01T00:00:00Z",
                "address": "nowhere",
                "city": "Paris",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let (status, _) = app
        .send(Method::GET, "/api/user/joined", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.db.fetch_events().await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_event_input_is_a_validation_error() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/event/newEvent",
            Some(&alice.token),
            Some(json!({
                "title": "",
                "date": "2030-01-01T00:00:00Z",
                "address": "1 rue",
                "city": "Paris",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/event/newEvent",
            Some(&alice.token),
            Some(json!({ "title": "No date" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_events_are_not_found() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let missing = Uuid::new_v4();

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/event/{}/event-details", missing),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/event/{}/join", missing),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_someone_elses_profile_fails() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let mallory = app.account("mallory", Role::Member).await;

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/user/{}", alice.user.id),
            Some(&mallory.token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert!(app.db.fetch_user(alice.user.id).await.unwrap().is_some());
}

#[tokio::test]
async fn self_and_admin_can_delete_profiles() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let bob = app.account("bob", Role::Member).await;
    let admin = app.account("root", Role::Admin).await;

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/user/{}", alice.user.id),
            Some(&alice.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/user/{}", bob.user.id),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(app.db.fetch_user(alice.user.id).await.unwrap().is_none());
    assert!(app.db.fetch_user(bob.user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn password_updates_are_hashed_and_never_echoed() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let plaintext = "correct horse battery staple";

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/user/{}", alice.user.id),
            Some(&alice.token),
            Some(json!({ "password": plaintext, "level": "expert" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["level"], "expert");
    assert!(!body.to_string().contains(plaintext));
    assert!(body["data"].get("password_hash").is_none());

    let stored = app.db.fetch_user(alice.user.id).await.unwrap().unwrap();
    assert_ne!(stored.password_hash, plaintext);
    assert!(argon2::verify_encoded(&stored.password_hash, plaintext.as_bytes()).unwrap());
}

#[tokio::test]
async fn updating_another_profile_is_forbidden() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let mallory = app.account("mallory", Role::Member).await;

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/user/{}", alice.user.id),
            Some(&mallory.token),
            Some(json!({ "level": "expert" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let stored = app.db.fetch_user(alice.user.id).await.unwrap().unwrap();
    assert_eq!(stored.level, "beginner");
}

#[tokio::test]
async fn my_joined_and_promoted_events() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    let bob = app.account("bob", Role::Member).await;
    let concert = app.create_event(&alice, "Concert", "Lille").await;
    let market = app.create_event(&alice, "Market", "Lille").await;
    app.create_event(&bob, "Bob's party", "Lille").await;

    for id in [concert, market] {
        app.send(
            Method::POST,
            &format!("/api/event/{}/join", id),
            Some(&bob.token),
            None,
        )
        .await;
    }
    app.send(
        Method::PATCH,
        &format!("/api/event/{}", market),
        Some(&alice.token),
        None,
    )
    .await;

    let (status, joined) = app
        .send(Method::GET, "/api/user/joined", Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        joined["data"],
        json!([{ "title": "Concert", "city": "Lille", "date": "2030-06-21T19:00:00Z" }])
    );

    let (status, promoted) = app
        .send(Method::GET, "/api/user/promoted", Some(&alice.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let promoted = promoted["data"].as_array().unwrap();
    assert_eq!(promoted.len(), 2);
    assert!(promoted.iter().all(|e| e.get("address").is_none()));
}

#[tokio::test]
async fn public_user_listing_exposes_only_profiles() {
    let app = TestApp::new();
    let alice = app.account("alice", Role::Member).await;
    app.account("bob", Role::Admin).await;

    let (status, body) = app.send(Method::GET, "/api/user", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    for user in users {
        let mut keys: Vec<&str> = user.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["id", "level", "username"]);
    }

    let (status, body) = app
        .send(Method::GET, &format!("/api/user/{}", alice.user.id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");

    let (status, _) = app
        .send(Method::GET, &format!("/api/user/{}", Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_listing_query_uses_the_error_envelope() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::GET,
            "/api/event/event-list?city=Lyon&city=Paris",
            None,
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
