//! Password authentication.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;
use tracing::instrument;

use ledgerdesk_core::{Email, EmailError, ProfileId};

use crate::db::{Repositories, RepositoryError};
use crate::models::Profile;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The email already has a login.
    #[error("a user with this email already exists")]
    EmailTaken,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// Authentication service.
pub struct AuthService<'a> {
    repos: &'a Repositories,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// or the credential has no profile.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Profile, AuthError> {
        let email = Email::parse(email)?;

        let identity = self
            .repos
            .identities
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &identity.password_hash)?;

        self.repos
            .profiles
            .get(identity.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Create a login for a new profile ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::EmailTaken` if the email already has a login.
    pub async fn register(
        &self,
        id: ProfileId,
        email: &Email,
        password: &str,
    ) -> Result<(), AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.repos
            .identities
            .create(id, email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })
    }

    /// Replace a profile's password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::Repository(NotFound)` if the profile has no login.
    #[instrument(skip(self, password))]
    pub async fn reset_password(&self, id: ProfileId, password: &str) -> Result<(), AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        self.repos.identities.set_password(id, &password_hash).await?;
        tracing::info!(profile_id = %id, "Password reset");
        Ok(())
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ledgerdesk_core::Role;

    use super::*;
    use crate::models::NewProfile;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("longenough").is_ok());
    }

    #[tokio::test]
    async fn test_register_login_and_reset() {
        let repos = Repositories::in_memory();
        let auth = AuthService::new(&repos);
        let email = Email::parse("Teller@Bank.test").unwrap();
        let id = ProfileId::generate();

        auth.register(id, &email, "first-password").await.unwrap();
        repos
            .profiles
            .create(NewProfile {
                id,
                full_name: "Teller".to_string(),
                email: email.clone(),
                role: Role::Admin,
                created_by_admin_id: None,
                phone: None,
            })
            .await
            .unwrap();

        let profile = auth.login("teller@bank.test", "first-password").await.unwrap();
        assert_eq!(profile.id, id);

        assert!(matches!(
            auth.register(ProfileId::generate(), &email, "other-password").await,
            Err(AuthError::EmailTaken)
        ));

        auth.reset_password(id, "second-password").await.unwrap();
        assert!(matches!(
            auth.login("teller@bank.test", "first-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(auth.login("teller@bank.test", "second-password").await.is_ok());
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let repos = Repositories::in_memory();
        assert!(matches!(
            AuthService::new(&repos).login("nobody@bank.test", "whatever1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
