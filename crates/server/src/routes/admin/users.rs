//! User management.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::{AccountType, CurrencyCode, Email, ProfileId, Role};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Account, Profile, ProfileUpdate, ProfileWithAccounts};
use crate::routes::{ApiResponse, Done, JsonBody};
use crate::services::{CreateUser, OpenAccount, UserService};
use crate::state::AppState;

/// Build the user management router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", put(update_user).delete(delete_user))
        .route("/users/{id}/reset-password", post(reset_password))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// First account opened together with a new user.
#[derive(Debug, Default, Deserialize)]
pub struct InitialAccountRequest {
    pub balance: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    pub account_type: Option<AccountType>,
}

/// Request to provision a user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: Email,
    pub password: String,
    pub full_name: String,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub initial_account: Option<InitialAccountRequest>,
}

/// Partial profile edit.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

/// New password for a user.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<ProfileWithAccounts>,
}

#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub user: Profile,
    pub account: Option<Account>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: Profile,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /api/admin/users
async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ApiResponse<UsersResponse>> {
    let users = UserService::new(state.repos()).list_with_accounts().await?;
    Ok(ApiResponse(UsersResponse { users }))
}

/// POST /api/admin/users
async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<ApiResponse<CreatedUserResponse>> {
    let input = CreateUser {
        email: request.email,
        password: request.password,
        full_name: request.full_name,
        role: request.role.unwrap_or_default(),
        phone: request.phone,
        initial_account: request.initial_account.map(|a| OpenAccount {
            balance: a.balance,
            currency: a.currency,
            account_type: a.account_type,
            account_number: None,
        }),
    };

    let (user, account) = UserService::new(state.repos())
        .create(admin.id, input)
        .await?;

    Ok(ApiResponse(CreatedUserResponse { user, account }))
}

/// PUT /api/admin/users/{id}
async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProfileId>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> Result<ApiResponse<UserResponse>> {
    let update = ProfileUpdate {
        full_name: request.full_name,
        phone: request.phone,
        role: request.role,
    };

    let user = UserService::new(state.repos()).update(id, update).await?;
    Ok(ApiResponse(UserResponse { user }))
}

/// DELETE /api/admin/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProfileId>,
) -> Result<ApiResponse<Done>> {
    UserService::new(state.repos()).delete(admin.id, id).await?;
    Ok(ApiResponse::done("user deleted"))
}

/// POST /api/admin/users/{id}/reset-password
async fn reset_password(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProfileId>,
    JsonBody(request): JsonBody<ResetPasswordRequest>,
) -> Result<ApiResponse<Done>> {
    UserService::new(state.repos())
        .reset_password(id, &request.password)
        .await?;
    Ok(ApiResponse::done("password updated"))
}
