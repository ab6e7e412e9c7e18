//! Account opening and admin account maintenance.

use rand::Rng;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use ledgerdesk_core::{
    AccountId, AccountStatus, AccountType, CurrencyCode, Money, MoneyError, ProfileId,
};

use crate::db::{Repositories, RepositoryError};
use crate::models::{Account, AccountUpdate, NewAccount};

/// Digits in a generated account number.
pub const ACCOUNT_NUMBER_DIGITS: usize = 10;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// The account does not exist.
    #[error("account not found")]
    NotFound,

    /// The owning profile does not exist.
    #[error("user not found")]
    OwnerNotFound,

    /// Balance has sub-cent precision.
    #[error("{0}")]
    InvalidAmount(#[from] MoneyError),

    /// Account number isn't all digits.
    #[error("account number must contain only digits")]
    InvalidAccountNumber,
}

/// Parameters for opening an account. Omitted fields take their defaults.
#[derive(Debug, Clone, Default)]
pub struct OpenAccount {
    pub balance: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    pub account_type: Option<AccountType>,
    pub account_number: Option<String>,
}

impl OpenAccount {
    /// Check the parameters without touching storage.
    ///
    /// Returns the normalized balance and account number (`None` when one
    /// should be generated).
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidAmount` for negative or sub-cent balances.
    /// Returns `AccountError::InvalidAccountNumber` for non-numeric numbers.
    pub fn validate(&self) -> Result<(Money, Option<String>), AccountError> {
        let currency = self.currency.unwrap_or_default();
        let balance = Money::new(self.balance.unwrap_or(Decimal::ZERO), currency)?;
        let account_number = match &self.account_number {
            Some(number) => {
                let number = number.trim();
                if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
                    return Err(AccountError::InvalidAccountNumber);
                }
                Some(number.to_string())
            }
            None => None,
        };
        Ok((balance, account_number))
    }
}

/// Random numeric account number. Not checked for uniqueness.
#[must_use]
pub fn generate_account_number() -> String {
    let mut rng = rand::rng();
    (0..ACCOUNT_NUMBER_DIGITS)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Account service over the shared repositories.
pub struct AccountService<'a> {
    repos: &'a Repositories,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    /// Open an account for an existing profile.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::OwnerNotFound` if the profile doesn't exist.
    /// Returns `AccountError::InvalidAmount` for negative or sub-cent balances.
    #[instrument(skip(self, params))]
    pub async fn open(
        &self,
        user_id: ProfileId,
        params: OpenAccount,
    ) -> Result<Account, AccountError> {
        if self.repos.profiles.get(user_id).await?.is_none() {
            return Err(AccountError::OwnerNotFound);
        }

        let (balance, account_number) = params.validate()?;
        let account_number = account_number.unwrap_or_else(generate_account_number);

        let account = self
            .repos
            .accounts
            .create(NewAccount {
                user_id,
                account_number,
                account_type: params.account_type.unwrap_or_default(),
                balance: balance.amount,
                currency: balance.currency,
            })
            .await?;

        tracing::info!(account_id = %account.id, "Account opened");
        Ok(account)
    }

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account doesn't exist.
    pub async fn get(&self, id: AccountId) -> Result<Account, AccountError> {
        self.repos
            .accounts
            .get(id)
            .await?
            .ok_or(AccountError::NotFound)
    }

    /// Apply an admin edit.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account doesn't exist.
    /// Returns `AccountError::InvalidAmount` for negative balances or more than two decimals.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: AccountId,
        update: &AccountUpdate,
    ) -> Result<Account, AccountError> {
        let mut update = update.clone();
        if let Some(balance) = update.balance {
            let currency = update.currency.unwrap_or_default();
            update.balance = Some(Money::new(balance, currency)?.amount);
        }

        self.repos
            .accounts
            .update(id, &update)
            .await
            .map_err(not_found_as(AccountError::NotFound))
    }

    /// Change only the status.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account doesn't exist.
    pub async fn set_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, AccountError> {
        self.update(
            id,
            &AccountUpdate {
                status: Some(status),
                ..AccountUpdate::default()
            },
        )
        .await
    }

    /// Close and remove an account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: AccountId) -> Result<(), AccountError> {
        self.repos
            .accounts
            .delete(id)
            .await
            .map_err(not_found_as(AccountError::NotFound))
    }
}

fn not_found_as(err: AccountError) -> impl FnOnce(RepositoryError) -> AccountError {
    move |e| match e {
        RepositoryError::NotFound => err,
        other => AccountError::Repository(other),
    }
}
