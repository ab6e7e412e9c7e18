//! Authentication extractors.
//!
//! The session holds a [`SessionProfile`] after login, but only its id is
//! trusted: the profile is loaded again on every request, so a deleted
//! profile is anonymous and a role change takes effect immediately. The
//! resolved [`Caller`] is cached in the request extensions, so several
//! extractors on one handler load it once.
//!
//! - [`CurrentCaller`] yields a [`Caller`], anonymous or not
//! - [`RequireUser`] rejects anonymous callers with 401
//! - [`RequireAdmin`] additionally rejects non-admins with 403

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{Caller, SessionProfile, session_keys};
use crate::state::AppState;

async fn session_profile(parts: &Parts) -> Option<SessionProfile> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<SessionProfile>(session_keys::CURRENT_PROFILE)
        .await
        .ok()
        .flatten()
}

async fn resolve_caller(parts: &mut Parts, state: &AppState) -> Result<Caller, AppError> {
    if let Some(caller) = parts.extensions.get::<Caller>() {
        return Ok(*caller);
    }

    let caller = match session_profile(parts).await {
        Some(stored) => match state.repos().profiles.get(stored.id).await? {
            Some(profile) => Caller::Authenticated {
                id: profile.id,
                role: profile.role,
            },
            None => {
                tracing::debug!(profile_id = %stored.id, "Session profile no longer exists");
                Caller::Anonymous
            }
        },
        None => Caller::Anonymous,
    };

    parts.extensions.insert(caller);
    Ok(caller)
}

/// Extractor for the request's caller, anonymous or not.
///
/// Rejects only when the profile lookup itself fails.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentCaller(caller): CurrentCaller) -> impl IntoResponse {
///     match caller {
///         Caller::Authenticated { id, .. } => format!("Hello, {id}!"),
///         Caller::Anonymous => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct CurrentCaller(pub Caller);

impl<S> FromRequestParts<S> for CurrentCaller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Self(resolve_caller(parts, &state).await?))
    }
}

/// Extractor that requires any logged-in profile.
pub struct RequireUser(pub SessionProfile);

impl<S> FromRequestParts<S> for RequireUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentCaller(caller) = CurrentCaller::from_request_parts(parts, state).await?;
        match caller {
            Caller::Authenticated { id, role } => Ok(Self(SessionProfile { id, role })),
            Caller::Anonymous => Err(AppError::login_required()),
        }
    }
}

/// Extractor that requires a logged-in admin.
pub struct RequireAdmin(pub SessionProfile);

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentCaller(caller) = CurrentCaller::from_request_parts(parts, state).await?;
        match caller {
            Caller::Anonymous => Err(AppError::login_required()),
            Caller::Authenticated { .. } if !caller.is_admin() => {
                Err(AppError::Forbidden("admin access required".to_string()))
            }
            Caller::Authenticated { id, role } => Ok(Self(SessionProfile { id, role })),
        }
    }
}

/// Store the logged-in profile in the session.
///
/// The session ID is cycled first so a pre-login cookie can't be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_profile(
    session: &Session,
    profile: SessionProfile,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_PROFILE, profile).await
}

/// End the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_profile(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Request, StatusCode};
    use ledgerdesk_core::{ProfileId, Role};

    use super::*;
    use crate::db::Repositories;
    use crate::services::AvatarStore;

    fn parts() -> Parts {
        Request::builder().uri("/").body(()).unwrap().into_parts().0
    }

    fn state() -> AppState {
        AppState::new(
            Repositories::in_memory(),
            AvatarStore::new(std::env::temp_dir(), 1024),
        )
    }

    #[tokio::test]
    async fn test_no_session_is_anonymous() {
        let state = state();
        let mut parts = parts();

        let CurrentCaller(caller) = CurrentCaller::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(caller, Caller::Anonymous);

        let err = RequireUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_resolved_caller_is_reused_within_request() {
        let state = state();
        let id = ProfileId::generate();

        let mut parts = parts();
        parts.extensions.insert(Caller::Authenticated {
            id,
            role: Role::Admin,
        });
        let RequireAdmin(profile) = RequireAdmin::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(profile.id, id);

        let mut parts = self::parts();
        parts.extensions.insert(Caller::Authenticated {
            id,
            role: Role::User,
        });
        let err = RequireAdmin::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
