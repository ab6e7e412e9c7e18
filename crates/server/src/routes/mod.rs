//! HTTP route handlers.
//!
//! Everything lives under `/api`:
//!
//! - `/api/auth` - login, logout, current profile
//! - `/api/admin` - console endpoints, admin role required
//! - `/api/users` - customer dashboard endpoints, any logged-in profile
//!
//! Successful responses are wrapped as `{"success": true, ...fields}` by
//! [`ApiResponse`]; failures come from [`AppError`](crate::error::AppError).

pub mod admin;
pub mod auth;
pub mod stream;
pub mod users;

use axum::{
    Json, Router,
    extract::FromRequest,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Build the API router. `max_upload_bytes` bounds avatar uploads.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new().nest(
        "/api",
        Router::new()
            .nest("/auth", auth::router())
            .nest("/admin", admin::router())
            .nest("/users", users::router(max_upload_bytes)),
    )
}

/// JSON request body whose rejections use the failure envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Success envelope. `T` must serialize as a JSON object.
#[derive(Debug)]
pub struct ApiResponse<T>(pub T);

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(flatten)]
    data: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(Envelope {
            success: true,
            data: self.0,
        })
        .into_response()
    }
}

/// Body of responses that carry no data.
#[derive(Debug, Serialize)]
pub struct Done {
    pub message: &'static str,
}

impl ApiResponse<Done> {
    /// `{"success": true, "message": ...}`.
    #[must_use]
    pub const fn done(message: &'static str) -> Self {
        Self(Done { message })
    }
}
