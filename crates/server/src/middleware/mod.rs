//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (recorded on the request span)
//! 4. Session layer (tower-sessions)

pub mod auth;
pub mod client_id;
pub mod request_id;
pub mod session;

pub use auth::{
    CurrentCaller, RequireAdmin, RequireUser, clear_current_profile, set_current_profile,
};
pub use client_id::ClientId;
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, session_layer};
