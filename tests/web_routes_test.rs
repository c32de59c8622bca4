//! Integration tests for web routes.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use forum_activity::auth::{SessionData, Sessions};
use forum_activity::config::Config;
use forum_activity::db::{Database, Store};
use forum_activity::hooks::Hooks;
use forum_activity::topics::NewTopic;
use forum_activity::users::NewUser;
use forum_activity::web::{create_app, AppState};
use forum_activity::{now_ms, Forum, Uid};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    forum: Forum,
    sessions: Sessions,
    config: Config,
    _temp_dir: TempDir,
}

impl TestApp {
    async fn new(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let db = Database::new(&db_path)
            .await
            .expect("Failed to create database");
        let forum = Forum::new(Arc::new(db), Hooks::new());
        let sessions = Sessions::new(forum.store.clone());
        Self {
            forum,
            sessions,
            config,
            _temp_dir: temp_dir,
        }
    }

    fn router(&self) -> Router {
        create_app(AppState::new(self.forum.clone(), self.config.clone()))
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> axum::response::Response {
        let mut request = Request::builder().uri(uri);
        if let Some(token) = token {
            request = request.header(header::COOKIE, format!("theme=dark; session={token}"));
        }
        self.router()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn create_user(&self, username: &str, aboutme: Option<&str>) -> Uid {
        self.forum
            .users
            .create(&NewUser {
                username: username.to_string(),
                aboutme: aboutme.map(String::from),
                ..NewUser::default()
            })
            .await
            .unwrap()
    }
}

async fn body_string(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(Config::default()).await;

    let response = app.get("/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn test_profile_page() {
    let app = TestApp::new(Config::default()).await;
    let alice = app
        .create_user("alice", Some("<p>I like <b>tea</b> &amp; cake</p>"))
        .await;
    let cid = app.forum.create_category("General").await.unwrap();
    app.forum
        .post_topic(
            &NewTopic {
                uid: alice,
                cid,
                title: "Tea time".to_string(),
                timestamp: now_ms(),
                pinned: false,
                scheduled: false,
            },
            "Who wants tea?",
        )
        .await
        .unwrap();

    let response = app.get("/user/alice", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    // Guests get no session cookie
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let html = body_string(response).await;
    assert!(html.contains("<h1>alice</h1>"));
    assert!(html.contains(r#"<meta name="description" content="I like tea &amp; cake">"#));
    assert!(html.contains(r#"<meta property="og:title" content="alice">"#));
    assert!(html.contains("Tea time"));
    assert!(html.contains("Who wants tea?"));
}

#[tokio::test]
async fn test_profile_redirects_to_lowercase_slug() {
    let app = TestApp::new(Config::default()).await;
    app.create_user("alice", None).await;

    let response = app.get("/user/Alice", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/user/alice"
    );
}

#[tokio::test]
async fn test_profile_redirect_keeps_relative_path() {
    let config = Config {
        relative_path: "/forum".to_string(),
        ..Config::default()
    };
    let app = TestApp::new(config).await;
    app.create_user("alice", None).await;

    let response = app.get("/forum/user/ALICE", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/forum/user/alice"
    );

    let response = app.get("/forum/user/alice", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_profile_lowercases_without_redirect() {
    let app = TestApp::new(Config::default()).await;
    let alice = app.create_user("alice", None).await;

    let response = app.get("/api/user/Alice", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["uid"], alice);
    assert_eq!(json["userslug"], "alice");
    assert_eq!(json["title"], "alice");
    assert_eq!(json["profileviews"], 1);
    assert_eq!(json["reputation"], 0);
    assert!(json["latest_posts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_api_profile_omits_disabled_reputation() {
    let config = Config {
        reputation_disabled: true,
        ..Config::default()
    };
    let app = TestApp::new(config).await;
    app.create_user("alice", None).await;

    let json = body_json(app.get("/api/user/alice", None).await).await;
    assert!(json.get("reputation").is_none());
    assert_eq!(json["allow_cover_picture"], true);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let app = TestApp::new(Config::default()).await;

    let response = app.get("/user/nobody", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/api/user/nobody", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_email_changed_notice_shown_once() {
    let app = TestApp::new(Config::default()).await;
    let bob = app.create_user("bob", None).await;

    let token = app.sessions.create(bob).await.unwrap();
    app.sessions
        .save(
            &token,
            &SessionData {
                uid: bob,
                email_changed: Some("bob@example.com".to_string()),
                ..SessionData::default()
            },
        )
        .await
        .unwrap();

    let response = app.get("/api/user/bob", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with(&format!("session={token};")));
    assert!(cookie.contains("HttpOnly"));

    let json = body_json(response).await;
    assert_eq!(json["email_changed"], "bob@example.com");
    assert_eq!(json["is_self"], true);

    let json = body_json(app.get("/api/user/bob", Some(&token)).await).await;
    assert!(json["email_changed"].is_null());
    assert_eq!(app.sessions.load(&token).await.unwrap().unwrap().email_changed, None);
}

#[tokio::test]
async fn test_profile_views_deduplicated_per_session() {
    let app = TestApp::new(Config::default()).await;
    let alice = app.create_user("alice", None).await;
    let bob = app.create_user("bob", None).await;
    let token = app.sessions.create(bob).await.unwrap();

    for _ in 0..3 {
        let response = app.get("/user/alice", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let user = app.forum.users.get_user(alice).await.unwrap().unwrap();
    assert_eq!(user.profileviews, 1);

    let session = app.sessions.load(&token).await.unwrap().unwrap();
    assert!(session.uids_viewed.contains_key(&alice));

    // Guests never count
    app.get("/user/alice", None).await;
    let user = app.forum.users.get_user(alice).await.unwrap().unwrap();
    assert_eq!(user.profileviews, 1);
}

#[tokio::test]
async fn test_unknown_session_token_treated_as_guest() {
    let app = TestApp::new(Config::default()).await;
    let alice = app.create_user("alice", None).await;

    let response = app.get("/user/alice", Some("made-up-token")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    // No record is created for a token that was never issued
    assert!(app.sessions.load("made-up-token").await.unwrap().is_none());
    assert_eq!(
        app.forum
            .store
            .get_object_field("session:made-up-token", "data")
            .await
            .unwrap(),
        None
    );

    let user = app.forum.users.get_user(alice).await.unwrap().unwrap();
    assert_eq!(user.profileviews, 0);
}

#[tokio::test]
async fn test_api_latest_topics() {
    let app = TestApp::new(Config::default()).await;
    let alice = app.create_user("alice", None).await;
    let cid = app.forum.create_category("General").await.unwrap();

    let now = now_ms();
    for (title, age) in [("Old", 3 * 86_400_000), ("Fresh", 60_000)] {
        app.forum
            .post_topic(
                &NewTopic {
                    uid: alice,
                    cid,
                    title: title.to_string(),
                    timestamp: now - age,
                    pinned: false,
                    scheduled: false,
                },
                "Body",
            )
            .await
            .unwrap();
    }

    let json = body_json(app.get("/api/topics/latest", None).await).await;
    assert_eq!(json["nextStart"], 20);
    let topics = json["topics"].as_array().unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0]["title"], "Fresh");

    let json = body_json(app.get("/api/topics/latest?term=week&start=0&stop=0", None).await).await;
    assert_eq!(json["nextStart"], 1);
    assert_eq!(json["topics"][0]["title"], "Fresh");

    let json = body_json(app.get("/api/topics/latest?term=week&start=1&stop=-1", None).await).await;
    assert_eq!(json["nextStart"], 0);
    assert_eq!(json["topics"][0]["title"], "Old");
}

#[tokio::test]
async fn test_api_category_recent() {
    let app = TestApp::new(Config::default()).await;
    let alice = app.create_user("alice", None).await;
    let cid = app.forum.create_category("General").await.unwrap();

    let now = now_ms();
    for (title, pinned) in [("Pinned", true), ("Regular", false)] {
        app.forum
            .post_topic(
                &NewTopic {
                    uid: alice,
                    cid,
                    title: title.to_string(),
                    timestamp: now,
                    pinned,
                    scheduled: false,
                },
                "Body",
            )
            .await
            .unwrap();
    }

    let response = app
        .get(&format!("/api/category/{cid}/recent?start=0&stop=9"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["nextStart"], 10);
    let topics = json["topics"].as_array().unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0]["title"], "Regular");

    let json = body_json(app.get("/api/category/999/recent", None).await).await;
    assert!(json["topics"].as_array().unwrap().is_empty());
}
