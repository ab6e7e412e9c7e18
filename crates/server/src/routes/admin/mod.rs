//! Admin console API. Every handler requires the admin role.

pub mod accounts;
pub mod chats;
pub mod stats;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(users::router())
        .merge(accounts::router())
        .merge(chats::router())
        .merge(stats::router())
}
