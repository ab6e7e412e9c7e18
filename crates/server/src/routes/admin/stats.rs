//! Console dashboard statistics.

use axum::{Router, extract::State, routing::get};
use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::ApiResponse;
use crate::services::AdminStats;
use crate::state::AppState;

/// Build the stats router.
pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(stats))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: AdminStats,
}

/// GET /api/admin/stats
async fn stats(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<ApiResponse<StatsResponse>> {
    let stats = state.dashboard().admin_stats(admin.id, Utc::now()).await?;
    Ok(ApiResponse(StatsResponse { stats }))
}
