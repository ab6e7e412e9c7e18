//! Admin bootstrap commands.
//!
//! Admins normally create users through the console, which needs an admin
//! to exist first. These commands create that first admin and recover
//! lost passwords.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string

use thiserror::Error;

use ledgerdesk_core::{Email, EmailError, ProfileId, Role};
use ledgerdesk_server::db::{Repositories, RepositoryError};
use ledgerdesk_server::models::NewProfile;
use ledgerdesk_server::services::{AuthError, AuthService};

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Login creation or update failed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Database error.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// No login exists for the email.
    #[error("No login found for email: {0}")]
    UnknownEmail(String),
}

/// Create an admin profile with a password login.
///
/// The admin has no `created_by_admin_id`; it is the root of the users it
/// goes on to create.
///
/// # Errors
///
/// Returns `AdminError` if the email is invalid or taken, the password is
/// too short, or the database is unreachable.
pub async fn create_admin(
    email: &str,
    name: &str,
    password: &str,
    phone: Option<String>,
) -> Result<ProfileId, AdminError> {
    let email = Email::parse(email)?;
    let repos = Repositories::postgres(&connect().await?);

    let id = ProfileId::generate();
    AuthService::new(&repos)
        .register(id, &email, password)
        .await?;

    if let Err(e) = repos
        .profiles
        .create(NewProfile {
            id,
            full_name: name.trim().to_string(),
            email: email.clone(),
            role: Role::Admin,
            created_by_admin_id: None,
            phone,
        })
        .await
    {
        if let Err(cleanup) = repos.identities.delete(id).await {
            tracing::warn!(profile_id = %id, error = %cleanup, "Orphaned login left behind");
        }
        return Err(e.into());
    }

    tracing::info!("Admin created successfully! ID: {}, Email: {}", id, email);
    Ok(id)
}

/// Replace the password of the login with `email`.
///
/// # Errors
///
/// Returns `AdminError::UnknownEmail` if no login has that email.
pub async fn reset_password(email: &str, password: &str) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    let repos = Repositories::postgres(&connect().await?);

    let identity = repos
        .identities
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UnknownEmail(email.to_string()))?;

    AuthService::new(&repos)
        .reset_password(identity.id, password)
        .await?;

    tracing::info!("Password reset for {}", email);
    Ok(())
}
