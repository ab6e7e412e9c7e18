//! HTTP-level tests for the JSON API.
//!
//! Each test builds the full router over in-memory repositories and an
//! in-memory session store, then drives it with `oneshot`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::path::PathBuf;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use futures::StreamExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use ledgerdesk_core::{ChatId, Email, MessageType, ProfileId, Role};
use ledgerdesk_server::db::Repositories;
use ledgerdesk_server::middleware::session_layer;
use ledgerdesk_server::models::NewProfile;
use ledgerdesk_server::services::{AuthService, AvatarStore};
use ledgerdesk_server::state::AppState;

const ADMIN_EMAIL: &str = "admin@ledgerdesk.test";
const ADMIN_PASSWORD: &str = "admin-password";
const CUSTOMER_EMAIL: &str = "casey@ledgerdesk.test";
const CUSTOMER_PASSWORD: &str = "customer-password";

struct TestApp {
    router: Router,
    state: AppState,
    storage: PathBuf,
}

impl TestApp {
    fn new() -> Self {
        let storage =
            std::env::temp_dir().join(format!("ledgerdesk-api-test-{}", uuid::Uuid::new_v4()));
        let state = AppState::new(
            Repositories::in_memory(),
            AvatarStore::new(storage.clone(), 1024 * 1024),
        );
        let router = ledgerdesk_server::app(
            state.clone(),
            session_layer(MemoryStore::default(), false),
        );
        Self {
            router,
            state,
            storage,
        }
    }

    fn repos(&self) -> &Repositories {
        self.state.repos()
    }

    /// Insert an admin directly, bypassing the API.
    async fn seed_admin(&self) -> ProfileId {
        let id = ProfileId::generate();
        let email = Email::parse(ADMIN_EMAIL).unwrap();
        AuthService::new(self.repos())
            .register(id, &email, ADMIN_PASSWORD)
            .await
            .unwrap();
        self.repos()
            .profiles
            .create(NewProfile {
                id,
                full_name: "Ada Admin".to_string(),
                email,
                role: Role::Admin,
                created_by_admin_id: None,
                phone: None,
            })
            .await
            .unwrap();
        id
    }

    async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Log in and return the session cookie pair.
    async fn login(&self, email: &str, password: &str) -> String {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": email, "password": password }).to_string(),
            ))
            .unwrap();

        let response = self.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// Seed an admin, create a customer through the API, and log both in.
    async fn with_customer(&self) -> (ProfileId, String, ProfileId, String) {
        let admin_id = self.seed_admin().await;
        let admin = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

        let (status, body) = self
            .call(
                Method::POST,
                "/api/admin/users",
                Some(&admin),
                Some(json!({
                    "email": CUSTOMER_EMAIL,
                    "password": CUSTOMER_PASSWORD,
                    "full_name": "Casey Customer",
                    "initial_account": { "balance": "100.00", "currency": "USD" },
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let customer_id: ProfileId = serde_json::from_value(body["user"]["id"].clone()).unwrap();

        let customer = self.login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD).await;
        (admin_id, admin, customer_id, customer)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.storage);
    }
}

// =============================================================================
// Auth and envelope
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(Request::get("/health/ready").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_caller_gets_401_envelope() {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::GET, "/api/users/profile", None, None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let app = TestApp::new();
    app.seed_admin().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_customer_cannot_use_admin_api() {
    let app = TestApp::new();
    let (_, _, _, customer) = app.with_customer().await;

    let (status, body) = app
        .call(Method::GET, "/api/admin/users", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .call(Method::GET, "/api/auth/me", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["profile"]["email"], CUSTOMER_EMAIL);
    assert_eq!(body["profile"]["role"], "user");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new();
    app.seed_admin().await;
    let admin = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, _) = app
        .call(Method::POST, "/api/auth/logout", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::GET, "/api/admin/stats", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Users and accounts
// =============================================================================

#[tokio::test]
async fn test_created_user_is_listed_with_account() {
    let app = TestApp::new();
    let (admin_id, admin, customer_id, _) = app.with_customer().await;

    let (status, body) = app
        .call(Method::GET, "/api/admin/users", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let users = body["users"].as_array().unwrap();
    let customer = users
        .iter()
        .find(|u| u["id"] == json!(customer_id))
        .unwrap();
    assert_eq!(customer["created_by_admin_id"], json!(admin_id));
    assert_eq!(customer["accounts"].as_array().unwrap().len(), 1);
    assert_eq!(customer["accounts"][0]["balance"], "100.00");
}

#[tokio::test]
async fn test_account_update_is_reflected_by_get() {
    let app = TestApp::new();
    let (_, admin, customer_id, _) = app.with_customer().await;
    let account = app.repos().accounts.list_for_user(customer_id).await.unwrap()[0].clone();
    let uri = format!("/api/admin/accounts/{}", account.id);

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "balance": "2500.50", "status": "disabled" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app.call(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["balance"], "2500.50");
    assert_eq!(body["account"]["status"], "disabled");
    assert_eq!(body["account"]["currency"], "USD");
}

#[tokio::test]
async fn test_account_rejects_sub_cent_balance() {
    let app = TestApp::new();
    let (_, admin, customer_id, _) = app.with_customer().await;
    let account = app.repos().accounts.list_for_user(customer_id).await.unwrap()[0].clone();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/admin/accounts/{}", account.id),
            Some(&admin),
            Some(json!({ "balance": "1.005" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_account_rejects_negative_balance_and_normalizes_scale() {
    let app = TestApp::new();
    let (_, admin, customer_id, _) = app.with_customer().await;
    let account = app.repos().accounts.list_for_user(customer_id).await.unwrap()[0].clone();
    let uri = format!("/api/admin/accounts/{}", account.id);

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "balance": "-9999.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/accounts",
            Some(&admin),
            Some(json!({ "user_id": customer_id, "balance": "-1.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(app.repos().accounts.list_for_user(customer_id).await.unwrap().len(), 1);

    let (status, body) = app
        .call(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "balance": "500.5", "status": "suspended" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["account"]["balance"], "500.50");
}

#[tokio::test]
async fn test_invalid_initial_account_leaves_no_user() {
    let app = TestApp::new();
    app.seed_admin().await;
    let admin = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let create = |balance: &str| {
        json!({
            "email": CUSTOMER_EMAIL,
            "password": CUSTOMER_PASSWORD,
            "full_name": "Casey Customer",
            "initial_account": { "balance": balance },
        })
    };

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/users",
            Some(&admin),
            Some(create("1.001")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (_, body) = app
        .call(Method::GET, "/api/admin/users", Some(&admin), None)
        .await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/users",
            Some(&admin),
            Some(create("1.00")),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["account"]["balance"], "1.00");
}

#[tokio::test]
async fn test_role_changes_apply_to_live_sessions() {
    let app = TestApp::new();
    app.seed_admin().await;
    let admin = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/users",
            Some(&admin),
            Some(json!({
                "email": "second@ledgerdesk.test",
                "password": "second-password",
                "full_name": "Second Admin",
                "role": "admin",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let second_id: ProfileId = serde_json::from_value(body["user"]["id"].clone()).unwrap();
    let second = app.login("second@ledgerdesk.test", "second-password").await;

    let (status, _) = app
        .call(Method::GET, "/api/admin/users", Some(&second), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/admin/users/{second_id}"),
            Some(&admin),
            Some(json!({ "role": "user" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "user");

    let (status, _) = app
        .call(Method::GET, "/api/admin/users", Some(&second), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = app
        .call(Method::GET, "/api/auth/me", Some(&second), None)
        .await;
    assert_eq!(body["profile"]["role"], "user");

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/admin/users/{second_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(Method::GET, "/api/users/profile", Some(&second), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_delete_user_removes_everything() {
    let app = TestApp::new();
    let (_, admin, customer_id, customer) = app.with_customer().await;
    app.call(
        Method::POST,
        "/api/users/chat/messages",
        Some(&customer),
        Some(json!({ "content": "bye" })),
    )
    .await;

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/admin/users/{customer_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    assert!(app.repos().profiles.get(customer_id).await.unwrap().is_none());
    assert!(app.repos().chats.list_for_user(customer_id).await.unwrap().is_empty());
    assert_eq!(app.repos().messages.count_all().await.unwrap(), 0);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": CUSTOMER_EMAIL, "password": CUSTOMER_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Support chat
// =============================================================================

#[tokio::test]
async fn test_first_send_creates_one_chat_and_one_message() {
    let app = TestApp::new();
    let (admin_id, _, customer_id, customer) = app.with_customer().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/users/chat/messages",
            Some(&customer),
            Some(json!({ "content": "  Hello  " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"]["content"], "Hello");
    assert_eq!(body["message"]["sender_name"], "Casey Customer");

    let chats = app.repos().chats.list_for_user(customer_id).await.unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].admin_id, Some(admin_id));

    let messages = app.repos().messages.list_views(chats[0].id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(chats[0].updated_at >= messages[0].message.created_at);

    app.call(
        Method::POST,
        "/api/users/chat/messages",
        Some(&customer),
        Some(json!({ "content": "Still there?" })),
    )
    .await;
    assert_eq!(
        app.repos().chats.list_for_user(customer_id).await.unwrap().len(),
        1
    );
    assert_eq!(app.repos().messages.count_all().await.unwrap(), 2);
}

#[tokio::test]
async fn test_blank_send_writes_nothing() {
    let app = TestApp::new();
    let (_, _, customer_id, customer) = app.with_customer().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/users/chat/messages",
            Some(&customer),
            Some(json!({ "content": "   " })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(app.repos().chats.list_for_user(customer_id).await.unwrap().is_empty());
    assert_eq!(app.repos().messages.count_all().await.unwrap(), 0);
}

#[tokio::test]
async fn test_closing_chat_clears_admin_and_blocks_customer() {
    let app = TestApp::new();
    let (_, admin, _, customer) = app.with_customer().await;

    let (_, body) = app
        .call(
            Method::POST,
            "/api/users/chat/conversations",
            Some(&customer),
            None,
        )
        .await;
    let chat_id: ChatId = serde_json::from_value(body["chat"]["id"].clone()).unwrap();

    let (status, body) = app
        .call(
            Method::PATCH,
            &format!("/api/admin/chats/{chat_id}/status"),
            Some(&admin),
            Some(json!({ "status": "closed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["chat"]["status"], "closed");
    assert_eq!(body["chat"]["admin_id"], Value::Null);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/users/chat/messages",
            Some(&customer),
            Some(json!({ "chat_id": chat_id, "content": "anyone?" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/admin/chats/{chat_id}/messages"),
            Some(&admin),
            Some(json!({ "content": "Reopening soon" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reactivating_chat_assigns_acting_admin() {
    let app = TestApp::new();
    let (admin_id, admin, customer_id, _) = app.with_customer().await;
    let chat = app.state.chats().resolve_chat(customer_id).await.unwrap();

    app.call(
        Method::PATCH,
        &format!("/api/admin/chats/{}/status", chat.id),
        Some(&admin),
        Some(json!({ "status": "pending" })),
    )
    .await;
    let (_, body) = app
        .call(
            Method::PATCH,
            &format!("/api/admin/chats/{}/status", chat.id),
            Some(&admin),
            Some(json!({ "status": "active" })),
        )
        .await;

    assert_eq!(body["chat"]["admin_id"], json!(admin_id));

    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/admin/chats/{}/status", chat.id),
            Some(&admin),
            Some(json!({ "status": "archived" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mark_seen_and_inbox_counts() {
    let app = TestApp::new();
    let (admin_id, admin, customer_id, customer) = app.with_customer().await;
    let chat = app.state.chats().resolve_chat(customer_id).await.unwrap();

    let own = app
        .state
        .chats()
        .send_message(chat.id, customer_id, "question", MessageType::Text, None)
        .await
        .unwrap();
    let reply = app
        .state
        .chats()
        .send_message(chat.id, admin_id, "answer", MessageType::Text, None)
        .await
        .unwrap();

    let (_, body) = app
        .call(Method::GET, "/api/admin/chats", Some(&admin), None)
        .await;
    assert_eq!(body["chats"][0]["unseen_count"], 1);
    assert_eq!(body["chats"][0]["user_email"], CUSTOMER_EMAIL);
    assert_eq!(body["chats"][0]["last_message"], "answer");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/users/chat/mark-seen",
            Some(&customer),
            Some(json!({ "message_ids": [own.message.id, reply.message.id] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let marked = body["messages"].as_array().unwrap();
    assert_eq!(marked.len(), 1);
    assert_eq!(marked[0]["id"], json!(reply.message.id));
    assert_eq!(marked[0]["seen_by"], json!(customer_id));

    let (_, body) = app
        .call(Method::GET, "/api/users/dashboard", Some(&customer), None)
        .await;
    assert_eq!(body["unseen_messages"], 0);
}

#[tokio::test]
async fn test_editing_foreign_message_is_forbidden() {
    let app = TestApp::new();
    let (admin_id, _, customer_id, customer) = app.with_customer().await;
    let chat = app.state.chats().resolve_chat(customer_id).await.unwrap();
    let reply = app
        .state
        .chats()
        .send_message(chat.id, admin_id, "original", MessageType::Text, None)
        .await
        .unwrap();

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/users/chat/messages",
            Some(&customer),
            Some(json!({ "message_id": reply.message.id, "content": "tampered" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let stored = app
        .repos()
        .messages
        .get(reply.message.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.content, "original");
}

#[tokio::test]
async fn test_messages_load_in_ascending_order() {
    let app = TestApp::new();
    let (admin_id, _, customer_id, customer) = app.with_customer().await;
    let chats = app.state.chats();
    let chat = chats.resolve_chat(customer_id).await.unwrap();
    for (sender, text) in [(customer_id, "one"), (admin_id, "two"), (customer_id, "three")] {
        chats
            .send_message(chat.id, sender, text, MessageType::Text, None)
            .await
            .unwrap();
    }

    let (status, body) = app
        .call(Method::GET, "/api/users/chat/messages", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["one", "two", "three"]);
}

#[tokio::test]
async fn test_customer_cannot_read_foreign_chat() {
    let app = TestApp::new();
    let (admin_id, _, _, customer) = app.with_customer().await;

    let other = ProfileId::generate();
    app.repos()
        .profiles
        .create(NewProfile {
            id: other,
            full_name: "Other".to_string(),
            email: Email::parse("other@ledgerdesk.test").unwrap(),
            role: Role::User,
            created_by_admin_id: Some(admin_id),
            phone: None,
        })
        .await
        .unwrap();
    let foreign = app.state.chats().resolve_chat(other).await.unwrap();

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/users/chat/messages?chat_id={}", foreign.id),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stream_starts_with_snapshot() {
    let app = TestApp::new();
    let (_, _, customer_id, customer) = app.with_customer().await;
    let chats = app.state.chats();
    let chat = chats.resolve_chat(customer_id).await.unwrap();
    chats
        .send_message(chat.id, customer_id, "hi", MessageType::Text, None)
        .await
        .unwrap();

    let request = Request::get("/api/users/chat/stream")
        .header(header::COOKIE, &customer)
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.starts_with("event: snapshot"));
    assert!(text.contains("\"content\":\"hi\""));
}

// =============================================================================
// Dashboards and uploads
// =============================================================================

#[tokio::test]
async fn test_admin_stats_shape() {
    let app = TestApp::new();
    let (_, admin, _, _) = app.with_customer().await;

    let (status, body) = app
        .call(Method::GET, "/api/admin/stats", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["stats"]["total_users"], 1);
    assert_eq!(body["stats"]["total_accounts"], 1);
    assert_eq!(body["stats"]["total_balance"], "100.00");
    assert_eq!(body["stats"]["growth"]["users"], 100.0);
}

#[tokio::test]
async fn test_avatar_upload_updates_profile() {
    let app = TestApp::new();
    let (_, _, customer_id, customer) = app.with_customer().await;

    let boundary = "ledgerdesk-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         PNGDATA\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::post("/api/users/upload-avatar")
        .header(header::COOKIE, &customer)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    let url = json["avatar_url"].as_str().unwrap().to_string();
    assert!(url.starts_with(&format!("/storage/avatars/{customer_id}-")));

    let profile = app.repos().profiles.get(customer_id).await.unwrap().unwrap();
    assert_eq!(profile.avatar_url.as_deref(), Some(url.as_str()));

    let served = app
        .send(Request::get(url.as_str()).body(Body::empty()).unwrap())
        .await;
    assert_eq!(served.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_avatar_upload_rejects_non_image() {
    let app = TestApp::new();
    let (_, _, _, customer) = app.with_customer().await;

    let boundary = "ledgerdesk-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"avatar\"; filename=\"notes.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         hello\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::post("/api/users/upload-avatar")
        .header(header::COOKIE, &customer)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    assert_eq!(app.send(request).await.status(), StatusCode::BAD_REQUEST);
}
