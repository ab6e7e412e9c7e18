//! Customer dashboard API. Every handler requires a logged-in profile and
//! acts on that profile only.

pub mod avatar;
pub mod chat;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{Account, Profile};
use crate::routes::ApiResponse;
use crate::services::CustomerDashboard;
use crate::state::AppState;

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the customer router. `max_upload_bytes` bounds avatar uploads.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/accounts", get(accounts))
        .route("/dashboard", get(dashboard))
        .route(
            "/upload-avatar",
            post(avatar::upload_avatar).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .merge(chat::router())
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub dashboard: CustomerDashboard,
}

/// GET /api/users/profile
async fn profile(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<ApiResponse<ProfileResponse>> {
    let profile = state
        .repos()
        .profiles
        .get(current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("profile not found".to_string()))?;
    Ok(ApiResponse(ProfileResponse { profile }))
}

/// GET /api/users/accounts
async fn accounts(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<ApiResponse<AccountsResponse>> {
    let accounts = state.repos().accounts.list_for_user(current.id).await?;
    Ok(ApiResponse(AccountsResponse { accounts }))
}

/// GET /api/users/dashboard
async fn dashboard(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<ApiResponse<DashboardResponse>> {
    let dashboard = state.dashboard().customer_summary(current.id).await?;
    Ok(ApiResponse(DashboardResponse { dashboard }))
}
