//! Admin user provisioning and removal.

use thiserror::Error;
use tracing::instrument;

use ledgerdesk_core::{Email, ProfileId, Role};

use super::accounts::{AccountError, AccountService, OpenAccount};
use super::auth::{AuthError, AuthService};
use crate::db::{Repositories, RepositoryError};
use crate::models::{Account, NewProfile, Profile, ProfileUpdate, ProfileWithAccounts};

/// Errors that can occur during user management.
#[derive(Debug, Error)]
pub enum UserError {
    /// Database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Credential creation or update failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Opening the initial account failed.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// The profile does not exist.
    #[error("user not found")]
    NotFound,

    /// Input failed validation.
    #[error("{0}")]
    Invalid(String),
}

/// Input for provisioning a user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: Email,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub initial_account: Option<OpenAccount>,
}

/// User management service.
pub struct UserService<'a> {
    repos: &'a Repositories,
}

impl<'a> UserService<'a> {
    /// Create a new user service.
    #[must_use]
    pub const fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    /// Every profile with its accounts, newest profile first.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Repository` if a query fails.
    pub async fn list_with_accounts(&self) -> Result<Vec<ProfileWithAccounts>, UserError> {
        let profiles = self.repos.profiles.list().await?;
        let mut accounts = self.repos.accounts.list().await?;
        accounts.reverse();

        Ok(profiles
            .into_iter()
            .map(|profile| ProfileWithAccounts {
                accounts: accounts
                    .iter()
                    .filter(|a| a.user_id == profile.id)
                    .cloned()
                    .collect(),
                profile,
            })
            .collect())
    }

    /// Provision a login, a profile, and optionally a first account.
    ///
    /// The profile records `created_by` as its creating admin, which routes
    /// the user's support chat to that admin.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Invalid` if the name is blank.
    /// Returns `UserError::Auth` if the email is taken or the password is weak.
    /// Returns `UserError::Account` if the initial account is invalid; nothing
    /// is written in that case.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(
        &self,
        created_by: ProfileId,
        input: CreateUser,
    ) -> Result<(Profile, Option<Account>), UserError> {
        let full_name = input.full_name.trim();
        if full_name.is_empty() {
            return Err(UserError::Invalid("full_name is required".to_string()));
        }

        if let Some(params) = &input.initial_account {
            params.validate()?;
        }

        let id = ProfileId::generate();
        AuthService::new(self.repos)
            .register(id, &input.email, &input.password)
            .await?;

        let profile = match self
            .repos
            .profiles
            .create(NewProfile {
                id,
                full_name: full_name.to_string(),
                email: input.email.clone(),
                role: input.role,
                created_by_admin_id: Some(created_by),
                phone: normalize_phone(input.phone),
            })
            .await
        {
            Ok(profile) => profile,
            Err(e) => {
                self.discard_login(id).await;
                return Err(e.into());
            }
        };

        let account = match input.initial_account {
            Some(params) => match AccountService::new(self.repos).open(id, params).await {
                Ok(account) => Some(account),
                Err(e) => {
                    if let Err(cleanup) = self.repos.profiles.delete(id).await {
                        tracing::warn!(
                            profile_id = %id,
                            error = %cleanup,
                            "Orphaned profile left behind"
                        );
                    }
                    self.discard_login(id).await;
                    return Err(e.into());
                }
            },
            None => None,
        };

        tracing::info!(profile_id = %id, role = %profile.role, "User created");
        Ok((profile, account))
    }

    /// Apply an admin edit to a profile.
    ///
    /// # Errors
    ///
    /// Returns `UserError::NotFound` if the profile doesn't exist.
    pub async fn update(
        &self,
        id: ProfileId,
        mut update: ProfileUpdate,
    ) -> Result<Profile, UserError> {
        if let Some(name) = &update.full_name {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(UserError::Invalid("full_name cannot be blank".to_string()));
            }
            update.full_name = Some(trimmed.to_string());
        }
        update.phone = normalize_phone(update.phone);

        self.repos
            .profiles
            .update(id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => UserError::NotFound,
                other => UserError::Repository(other),
            })
    }

    /// Delete a user and everything they own.
    ///
    /// Runs accounts, chats (messages cascade), profile, then login, in that
    /// order, without a transaction. The first failing step aborts the rest
    /// and its error is returned; earlier steps are not rolled back.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Invalid` if an admin tries to delete themselves.
    /// Returns `UserError::NotFound` if the profile doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, acting_admin: ProfileId, id: ProfileId) -> Result<(), UserError> {
        if acting_admin == id {
            return Err(UserError::Invalid(
                "you cannot delete your own account".to_string(),
            ));
        }
        if self.repos.profiles.get(id).await?.is_none() {
            return Err(UserError::NotFound);
        }

        let accounts = self
            .repos
            .accounts
            .delete_for_user(id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Deleting accounts failed"))?;
        let chats = self
            .repos
            .chats
            .delete_for_user(id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Deleting chats failed"))?;
        self.repos
            .profiles
            .delete(id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Deleting profile failed"))?;

        match self.repos.identities.delete(id).await {
            Ok(()) | Err(RepositoryError::NotFound) => {}
            Err(e) => {
                tracing::error!(error = %e, "Deleting login failed");
                return Err(e.into());
            }
        }

        tracing::info!(accounts, chats, "User deleted");
        Ok(())
    }

    /// Set a new password for a user.
    ///
    /// # Errors
    ///
    /// Returns `UserError::NotFound` if the user has no login.
    /// Returns `UserError::Auth` if the password is weak.
    pub async fn reset_password(&self, id: ProfileId, password: &str) -> Result<(), UserError> {
        AuthService::new(self.repos)
            .reset_password(id, password)
            .await
            .map_err(|e| match e {
                AuthError::Repository(RepositoryError::NotFound) => UserError::NotFound,
                other => UserError::Auth(other),
            })
    }

    async fn discard_login(&self, id: ProfileId) {
        if let Err(e) = self.repos.identities.delete(id).await {
            tracing::warn!(profile_id = %id, error = %e, "Orphaned login left behind");
        }
    }
}

/// Blank phone numbers are treated as absent.
fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}
