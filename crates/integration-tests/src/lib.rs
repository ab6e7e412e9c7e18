//! End-to-end tests for LedgerDesk.
//!
//! These run against a live server and database, so every test is
//! `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! ld-cli migrate
//! ld-cli admin create --email admin@ledgerdesk.test --name "Test Admin" --password "$PW"
//! cargo run -p ledgerdesk-server &
//!
//! LEDGERDESK_ADMIN_EMAIL=admin@ledgerdesk.test LEDGERDESK_ADMIN_PASSWORD="$PW" \
//!     cargo test -p ledgerdesk-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `LEDGERDESK_BASE_URL` - server root (default `http://localhost:3000`)
//! - `LEDGERDESK_ADMIN_EMAIL` / `LEDGERDESK_ADMIN_PASSWORD` - an existing admin

use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use ledgerdesk_core::ProfileId;

/// Errors raised by the test harness itself.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A required environment variable is unset.
    #[error("{0} is not set")]
    MissingEnv(&'static str),

    /// The HTTP request failed before a response arrived.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something unexpected.
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Server root URL.
#[must_use]
pub fn base_url() -> String {
    std::env::var("LEDGERDESK_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A logged-in (or anonymous) HTTP session against the server.
///
/// Each context has its own cookie jar, so an admin and a customer can be
/// driven side by side.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl TestContext {
    /// Context with an empty cookie jar.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Http` if the client can't be built.
    pub fn anonymous() -> Result<Self, HarnessError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base_url: base_url(),
        })
    }

    /// Context logged in as the admin named by the environment.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::MissingEnv` if the admin credentials are unset.
    pub async fn admin() -> Result<Self, HarnessError> {
        let email = std::env::var("LEDGERDESK_ADMIN_EMAIL")
            .map_err(|_| HarnessError::MissingEnv("LEDGERDESK_ADMIN_EMAIL"))?;
        let password = std::env::var("LEDGERDESK_ADMIN_PASSWORD")
            .map_err(|_| HarnessError::MissingEnv("LEDGERDESK_ADMIN_PASSWORD"))?;
        Self::login(&email, &password).await
    }

    /// Context logged in with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Unexpected` if the login is refused.
    pub async fn login(email: &str, password: &str) -> Result<Self, HarnessError> {
        let ctx = Self::anonymous()?;
        let (status, body) = ctx
            .call(
                Method::POST,
                "/api/auth/login",
                Some(json!({ "email": email, "password": password })),
            )
            .await?;
        if status != StatusCode::OK {
            return Err(HarnessError::Unexpected(format!("login {status}: {body}")));
        }
        Ok(ctx)
    }

    /// Send a request and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Http` if the request or decoding fails.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value), HarnessError> {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    /// Create a customer through the admin API and return its id.
    ///
    /// The email is randomized so repeated runs don't collide.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Unexpected` if creation fails.
    pub async fn create_customer(
        &self,
        password: &str,
    ) -> Result<(ProfileId, String), HarnessError> {
        let email = format!("customer-{}@ledgerdesk.test", Uuid::new_v4().simple());
        let (status, body) = self
            .call(
                Method::POST,
                "/api/admin/users",
                Some(json!({
                    "email": email,
                    "password": password,
                    "full_name": "Integration Customer",
                    "initial_account": { "balance": "250.00" },
                })),
            )
            .await?;
        if status != StatusCode::OK {
            return Err(HarnessError::Unexpected(format!("create user {status}: {body}")));
        }

        let id = body["user"]["id"]
            .as_str()
            .and_then(|s| s.parse::<Uuid>().ok())
            .map(ProfileId::new)
            .ok_or_else(|| HarnessError::Unexpected(format!("no user id in {body}")))?;
        Ok((id, email))
    }

    /// Delete a user through the admin API, ignoring failures.
    pub async fn delete_user(&self, id: ProfileId) {
        let _ = self
            .call(Method::DELETE, &format!("/api/admin/users/{id}"), None)
            .await;
    }
}
