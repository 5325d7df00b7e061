//! End-to-end flow over the HTTP API: register, post a request, apply,
//! accept, chat, complete, and review.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use ligabairro::config::Settings;
use ligabairro::realtime::{request_room, ServerEvent};
use ligabairro::server::{create_router, AppState};
use ligabairro::services::ServiceContext;

struct TestApp {
    router: Router,
    ctx: ServiceContext,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_data_dir(dir.path().to_path_buf());
        settings.ensure_directories().unwrap();
        let ctx = ServiceContext::new(settings);
        ctx.db.init_schema().await.unwrap();
        let router = create_router(AppState::new(ctx.clone()));
        Self {
            router,
            ctx,
            _dir: dir,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Register a user and return (token, user id).
    async fn register(&self, name: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "password": "password123",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn test_full_help_cycle() {
    let app = TestApp::new().await;
    let (ana, ana_id) = app.register("Ana").await;
    let (bia, bia_id) = app.register("Bia").await;

    // Ana posts a request inside the service area.
    let (status, req) = app
        .call(
            Method::POST,
            "/api/requests",
            Some(&ana),
            Some(json!({
                "title": "Pick up medicine",
                "description": "Prescription is ready at the pharmacy downtown",
                "category": "pharmacy",
                "urgency": "high",
                "lat": -29.6450,
                "lng": -53.2510,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", req);
    let request_id = req["id"].as_str().unwrap().to_string();

    // Bia finds it nearby and applies.
    let (status, results) = app
        .call(
            Method::GET,
            "/api/requests?lat=-29.6447&lng=-53.2515&radius_km=2",
            Some(&bia),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results[0]["id"], request_id.as_str());

    let (status, application) = app
        .call(
            Method::POST,
            &format!("/api/requests/{}/applications", request_id),
            Some(&bia),
            Some(json!({ "message": "I pass by there every day" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", application);
    let application_id = application["id"].as_str().unwrap().to_string();

    // Applicants are not chat participants until accepted.
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/requests/{}/messages", request_id),
            Some(&bia),
            Some(json!({ "body": "hello?" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Ana was notified and accepts Bia.
    let (_, unread) = app
        .call(Method::GET, "/api/notifications/unread", Some(&ana), None)
        .await;
    assert_eq!(unread["count"], 1);

    let (status, accepted) = app
        .call(
            Method::POST,
            &format!("/api/applications/{}/accept", application_id),
            Some(&ana),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", accepted);
    assert_eq!(accepted["status"], "accepted");

    let (_, detail) = app
        .call(
            Method::GET,
            &format!("/api/requests/{}", request_id),
            Some(&ana),
            None,
        )
        .await;
    assert_eq!(detail["status"], "assigned");
    assert_eq!(detail["helper"]["id"], bia_id.as_str());

    // Chat messages fan out to the request room.
    let mut room = app.ctx.hub.subscribe(&request_room(&request_id));
    let (status, message) = app
        .call(
            Method::POST,
            &format!("/api/requests/{}/messages", request_id),
            Some(&bia),
            Some(json!({ "body": "On my way" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", message);
    match room.try_recv().unwrap() {
        ServerEvent::MessageNew(m) => assert_eq!(m.body, "On my way"),
        other => panic!("unexpected event {}", other.name()),
    }

    let (_, history) = app
        .call(
            Method::GET,
            &format!("/api/requests/{}/messages", request_id),
            Some(&ana),
            None,
        )
        .await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    // Bia completes; both review each other once.
    let (status, completed) = app
        .call(
            Method::POST,
            &format!("/api/requests/{}/complete", request_id),
            Some(&bia),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");

    let (status, review) = app
        .call(
            Method::POST,
            &format!("/api/requests/{}/reviews", request_id),
            Some(&ana),
            Some(json!({ "rating": 5, "comment": "Very kind" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", review);
    assert_eq!(review["reviewee_id"], bia_id.as_str());

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/requests/{}/reviews", request_id),
            Some(&ana),
            Some(json!({ "rating": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/requests/{}/reviews", request_id),
            Some(&bia),
            Some(json!({ "rating": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, profile) = app
        .call(Method::GET, &format!("/api/users/{}", bia_id), None, None)
        .await;
    assert_eq!(profile["rating_avg"], 5.0);
    assert_eq!(profile["rating_count"], 1);

    let (_, profile) = app
        .call(Method::GET, &format!("/api/users/{}", ana_id), None, None)
        .await;
    assert_eq!(profile["rating_count"], 1);
}

#[tokio::test]
async fn test_outsider_cannot_read_chat() {
    let app = TestApp::new().await;
    let (ana, _) = app.register("Ana").await;
    let (eve, _) = app.register("Eve").await;

    let (_, req) = app
        .call(
            Method::POST,
            "/api/requests",
            Some(&ana),
            Some(json!({
                "title": "Fix a shelf",
                "description": "Needs a drill and some patience",
                "category": "repairs",
                "lat": -29.6447,
                "lng": -53.2515,
            })),
        )
        .await;
    let request_id = req["id"].as_str().unwrap();

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/requests/{}/messages", request_id),
            Some(&eve),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Public detail hides the applicant list.
    let (status, detail) = app
        .call(
            Method::GET,
            &format!("/api/requests/{}", request_id),
            Some(&eve),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(detail.get("applications").is_none());
}

#[tokio::test]
async fn test_banned_user_is_locked_out() {
    let app = TestApp::new().await;
    let (token, _) = app.register("Ana").await;

    app.ctx
        .admin()
        .set_banned_by_email("ana@example.com", true)
        .await
        .unwrap();

    let (status, _) = app
        .call(Method::GET, "/api/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
