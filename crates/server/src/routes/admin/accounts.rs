//! Bank account maintenance.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::{AccountId, AccountStatus, AccountType, CurrencyCode, ProfileId};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Account, AccountUpdate};
use crate::routes::{ApiResponse, Done, JsonBody};
use crate::services::{AccountService, OpenAccount};
use crate::state::AppState;

/// Build the account router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/{id}",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route("/accounts/{id}/status", patch(set_status))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to open an account for a user.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub user_id: ProfileId,
    pub balance: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    pub account_type: Option<AccountType>,
    pub account_number: Option<String>,
}

/// Partial account edit.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub balance: Option<Decimal>,
    pub status: Option<AccountStatus>,
    pub currency: Option<CurrencyCode>,
    pub account_type: Option<AccountType>,
}

/// Status-only edit.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AccountStatus,
}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account: Account,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /api/admin/accounts
async fn list_accounts(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ApiResponse<AccountsResponse>> {
    let accounts = state.repos().accounts.list().await?;
    Ok(ApiResponse(AccountsResponse { accounts }))
}

/// POST /api/admin/accounts
async fn create_account(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    JsonBody(request): JsonBody<CreateAccountRequest>,
) -> Result<ApiResponse<AccountResponse>> {
    let account = AccountService::new(state.repos())
        .open(
            request.user_id,
            OpenAccount {
                balance: request.balance,
                currency: request.currency,
                account_type: request.account_type,
                account_number: request.account_number,
            },
        )
        .await?;

    Ok(ApiResponse(AccountResponse { account }))
}

/// GET /api/admin/accounts/{id}
async fn get_account(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<AccountId>,
) -> Result<ApiResponse<AccountResponse>> {
    let account = AccountService::new(state.repos()).get(id).await?;
    Ok(ApiResponse(AccountResponse { account }))
}

/// PUT /api/admin/accounts/{id}
async fn update_account(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<AccountId>,
    JsonBody(request): JsonBody<UpdateAccountRequest>,
) -> Result<ApiResponse<AccountResponse>> {
    let update = AccountUpdate {
        balance: request.balance,
        status: request.status,
        currency: request.currency,
        account_type: request.account_type,
    };

    let account = AccountService::new(state.repos()).update(id, &update).await?;
    tracing::info!(account_id = %id, admin_id = %admin.id, "Account updated");
    Ok(ApiResponse(AccountResponse { account }))
}

/// PATCH /api/admin/accounts/{id}/status
async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<AccountId>,
    JsonBody(request): JsonBody<StatusRequest>,
) -> Result<ApiResponse<AccountResponse>> {
    let account = AccountService::new(state.repos())
        .set_status(id, request.status)
        .await?;
    Ok(ApiResponse(AccountResponse { account }))
}

/// DELETE /api/admin/accounts/{id}
async fn delete_account(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<AccountId>,
) -> Result<ApiResponse<Done>> {
    AccountService::new(state.repos()).delete(id).await?;
    Ok(ApiResponse::done("account deleted"))
}
