//! Session login and logout.

use axum::{Router, extract::State, routing::{get, post}};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::{ApiResponse, Done, JsonBody};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireUser, clear_current_profile, set_current_profile};
use crate::models::{Profile, SessionProfile};
use crate::services::AuthService;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response carrying a profile.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: Profile,
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    session: Session,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<ApiResponse<ProfileResponse>> {
    let profile = AuthService::new(state.repos())
        .login(&request.email, &request.password)
        .await?;

    set_current_profile(
        &session,
        SessionProfile {
            id: profile.id,
            role: profile.role,
        },
    )
    .await?;
    set_sentry_user(profile.id, Some(profile.email.as_str()));

    tracing::info!(profile_id = %profile.id, role = %profile.role, "Login");
    Ok(ApiResponse(ProfileResponse { profile }))
}

/// POST /api/auth/logout
async fn logout(session: Session) -> Result<ApiResponse<Done>> {
    clear_current_profile(&session).await?;
    clear_sentry_user();
    Ok(ApiResponse::done("logged out"))
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<ApiResponse<ProfileResponse>> {
    let profile = state
        .repos()
        .profiles
        .get(current.id)
        .await?
        .ok_or_else(AppError::login_required)?;

    Ok(ApiResponse(ProfileResponse { profile }))
}
