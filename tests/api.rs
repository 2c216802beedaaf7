mod common;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower::ServiceExt;
use visit_booking::{
    AppState,
    config::Config,
    identity::{JwtIdentityResolver, UserIdentity},
    line::{GatewayError, NotificationGateway, SIGNATURE_HEADER, signature::sign},
    models::VisitSession,
    routes::build_router,
    store::{MemoryStore, ReservationStore},
};

use common::{remaining, service, session};

const JWT_SECRET: &str = "api-test-secret";
const LINE_SECRET: &str = "line-channel-secret";
const ADMIN_TOKEN: &str = "let-me-in";

/// 记录所有回复内容的消息通道
#[derive(Default)]
struct RecordingGateway {
    replies: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn reply(&self, reply_token: &str, texts: Vec<String>) -> Result<(), GatewayError> {
        self.replies
            .lock()
            .await
            .push((reply_token.to_string(), texts));
        Ok(())
    }

    async fn display_name(&self, _user_id: &str) -> Result<Option<String>, GatewayError> {
        Ok(Some("LINE 用户".to_string()))
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    gateway: Arc<RecordingGateway>,
    resolver: JwtIdentityResolver,
}

impl TestApp {
    fn new() -> Self {
        let admin_hash = bcrypt::hash(ADMIN_TOKEN, 4).unwrap();
        let vars: HashMap<&str, String> = HashMap::from([
            ("JWT_SECRET", JWT_SECRET.to_string()),
            ("LINE_CHANNEL_SECRET", LINE_SECRET.to_string()),
            ("LINE_CHANNEL_ACCESS_TOKEN", "access-token".to_string()),
            ("ADMIN_TOKEN_HASH", admin_hash),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

        let store = Arc::new(MemoryStore::with_sessions([
            session("S1", 20, 20),
            VisitSession {
                order: 2,
                ..session("S2", 5, 1)
            },
        ]));
        let gateway = Arc::new(RecordingGateway::default());
        let state = AppState {
            config: Arc::new(config),
            reservations: service(store.clone()),
            identity: Arc::new(JwtIdentityResolver::new(JWT_SECRET)),
            line: Some(gateway.clone() as Arc<dyn NotificationGateway>),
        };

        Self {
            router: build_router(state, None),
            store,
            gateway,
            resolver: JwtIdentityResolver::new(JWT_SECRET),
        }
    }

    fn token(&self, user_id: &str) -> String {
        let identity = UserIdentity {
            id: user_id.to_string(),
            name: Some("王小明".to_string()),
            image: None,
            line_user_id: None,
        };
        self.resolver
            .issue_token(&identity, Duration::hours(1))
            .unwrap()
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn register(&self, user_id: &str, body: Value) -> (StatusCode, Value) {
        self.send(post_json("/api/registrations", Some(&self.token(user_id)), &body))
            .await
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn registration(session_id: &str, visitors: i32) -> Value {
    json!({
        "session_id": session_id,
        "name": "王小明",
        "cellphone": "0912-345-678",
        "visitors": visitors,
    })
}

#[tokio::test]
async fn lists_open_sessions_without_login() {
    let app = TestApp::new();
    let (status, body) = app.send(get("/api/sessions", None)).await;

    assert_eq!(status, StatusCode::OK);
    let sessions = body.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["remaining_seats"], 20);
    assert_eq!(sessions[0]["total_seats"], 20);

    let (status, body) = app.send(get("/api/sessions/missing", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "SessionNotFound");
}

#[tokio::test]
async fn protected_routes_require_credentials() {
    let app = TestApp::new();

    let (status, body) = app
        .send(post_json("/api/registrations", None, &registration("S1", 2)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);

    let (status, _) = app.send(get("/api/me", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = TestApp::new();
    let req = Request::builder()
        .method("GET")
        .uri("/api/me")
        .header(header::COOKIE, format!("session_token={}", app.token("U1")))
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "U1");
}

#[tokio::test]
async fn register_then_cancel_over_http() {
    let app = TestApp::new();

    let (status, body) = app.register("U1", registration("S1", 3)).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(remaining(&*app.store, "S1").await, 17);

    let (status, body) = app
        .send(get("/api/registrations/mine", Some(&app.token("U1"))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], id.as_str());
    assert_eq!(body[0]["session"]["id"], "S1");
    assert_eq!(body[0]["visitors"], 3);

    let (status, body) = app
        .send(post_json(
            &format!("/api/registrations/{}/cancel", id),
            Some(&app.token("U1")),
            &json!({ "reason": "临时有事" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancel_reason"], "临时有事");
    assert_eq!(remaining(&*app.store, "S1").await, 20);
}

#[tokio::test]
async fn cancel_without_body_uses_default_reason() {
    let app = TestApp::new();
    let (_, body) = app.register("U1", registration("S1", 1)).await;
    let id = body["id"].as_str().unwrap();

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/registrations/{}/cancel", id))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token("U1")))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancel_reason"], "未提供原因");
}

#[tokio::test]
async fn reservation_failures_map_to_status_codes() {
    let app = TestApp::new();

    let (status, body) = app.register("U1", registration("S1", 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    let (status, body) = app.register("U1", registration("S2", 2)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CapacityExceeded");

    let (status, _) = app.register("U1", registration("S1", 2)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.register("U1", registration("S1", 1)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyRegistered");

    let (status, body) = app.register("U1", registration("S9", 1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "SessionNotFound");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = TestApp::new();
    let req = Request::builder()
        .method("POST")
        .uri("/api/registrations")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token("U1")))
        .body(Body::from("{\"session_id\": "))
        .unwrap();

    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

fn cancel_with_body(app: &TestApp, id: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/registrations/{}/cancel", id))
        .header(header::CONTENT_TYPE, content_type)
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token("U1")))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn malformed_cancel_body_uses_error_envelope() {
    let app = TestApp::new();
    let (_, body) = app.register("U1", registration("S1", 2)).await;
    let id = body["id"].as_str().unwrap().to_string();

    for raw in ["{bad", r#"{"reason": 5}"#] {
        let (status, body) = app
            .send(cancel_with_body(&app, &id, "application/json", raw))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", raw);
        assert_eq!(body["code"], 400);
        assert_eq!(body["error"], "ValidationError");
        assert!(body["error_message"].is_string());
    }

    let (status, body) = app
        .send(cancel_with_body(&app, &id, "text/plain", "{bad"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");

    // 失败的请求不影响名额与报名状态
    assert_eq!(remaining(&*app.store, "S1").await, 18);

    let (status, body) = app
        .send(cancel_with_body(&app, &id, "text/plain", r#"{"reason": "改期"}"#))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancel_reason"], "改期");
    assert_eq!(remaining(&*app.store, "S1").await, 20);
}

#[tokio::test]
async fn cancelling_someone_elses_registration_is_forbidden() {
    let app = TestApp::new();
    let (_, body) = app.register("U1", registration("S1", 4)).await;
    let id = body["id"].as_str().unwrap();

    let (status, body) = app
        .send(post_json(
            &format!("/api/registrations/{}/cancel", id),
            Some(&app.token("U2")),
            &json!({}),
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(remaining(&*app.store, "S1").await, 16);
}

#[tokio::test]
async fn admin_routes_check_the_admin_token() {
    let app = TestApp::new();
    let seed = json!({
        "sessions": [
            { "id": "S3", "date": "2025-06-01", "time": "09:00", "total_seats": 12 },
            { "id": "S1", "date": "2025-05-01", "time": "10:00", "total_seats": 99 }
        ]
    });

    let (status, _) = app
        .send(post_json("/api/admin/sessions/seed", Some("wrong"), &seed))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(post_json("/api/admin/sessions/seed", Some(ADMIN_TOKEN), &seed))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["submitted"], 2);
    assert_eq!(body["inserted"], 1);
    assert_eq!(
        app.store.get_session("S1").await.unwrap().unwrap().total_seats,
        20
    );

    let (status, body) = app
        .send(post_json(
            "/api/admin/sessions/S3/close",
            Some(ADMIN_TOKEN),
            &json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "S3");

    let (status, body) = app.register("U1", registration("S3", 1)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SessionClosed");
}

fn signed_webhook(body: &Value, signature: Option<String>) -> Request<Body> {
    let raw = body.to_string();
    let signature = signature.unwrap_or_else(|| sign(LINE_SECRET, raw.as_bytes()).unwrap());
    Request::builder()
        .method("POST")
        .uri("/api/line/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(raw))
        .unwrap()
}

fn postback(reply_token: &str, user_id: &str, data: &str) -> Value {
    json!({
        "destination": "Uxxxxxxxx",
        "events": [{
            "type": "postback",
            "replyToken": reply_token,
            "source": { "type": "user", "userId": user_id },
            "postback": { "data": data }
        }]
    })
}

#[tokio::test]
async fn webhook_rejects_bad_signature() {
    let app = TestApp::new();
    let body = postback("r1", "Uline1", "action=sessions");

    let (status, body) = app
        .send(signed_webhook(&body, Some("bm90LWEtc2lnbmF0dXJl".to_string())))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "InvalidSignature");
    assert!(app.gateway.replies.lock().await.is_empty());
}

#[tokio::test]
async fn webhook_postback_registers_and_replies() {
    let app = TestApp::new();
    let body = postback(
        "reply-1",
        "Uline1",
        "action=register&session_id=S1&visitors=2&cellphone=0912345678",
    );

    let (status, _) = app.send(signed_webhook(&body, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(remaining(&*app.store, "S1").await, 18);

    let registrations = app.store.registrations().await;
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].user_id, "line:Uline1");
    assert_eq!(registrations[0].name, "LINE 用户");

    let replies = app.gateway.replies.lock().await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, "reply-1");
}

#[tokio::test]
async fn webhook_failure_is_reported_in_reply() {
    let app = TestApp::new();
    let body = postback(
        "reply-2",
        "Uline1",
        "action=register&session_id=S2&visitors=3&cellphone=0912345678",
    );

    let (status, _) = app.send(signed_webhook(&body, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(remaining(&*app.store, "S2").await, 1);

    let replies = app.gateway.replies.lock().await;
    assert_eq!(replies.len(), 1);
    assert!(!replies[0].1[0].is_empty());
}

#[tokio::test]
async fn webhook_text_command_lists_sessions() {
    let app = TestApp::new();
    let body = json!({
        "events": [{
            "type": "message",
            "replyToken": "reply-3",
            "source": { "type": "user", "userId": "Uline2" },
            "message": { "type": "text", "text": "场次" }
        }]
    });

    let (status, _) = app.send(signed_webhook(&body, None)).await;
    assert_eq!(status, StatusCode::OK);

    let replies = app.gateway.replies.lock().await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].1[0].contains("S1") || replies[0].1[0].contains("2025-05-01"));
}

#[tokio::test]
async fn webhook_acknowledges_unreadable_signed_body() {
    let app = TestApp::new();
    let body = json!({ "events": 5 });

    let (status, _) = app.send(signed_webhook(&body, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(app.gateway.replies.lock().await.is_empty());
    assert!(app.store.registrations().await.is_empty());
}
