//! Bank account models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ledgerdesk_core::{AccountId, AccountStatus, AccountType, CurrencyCode, ProfileId};

use super::Profile;

/// A customer's bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: ProfileId,
    /// Display identifier; not guaranteed unique.
    pub account_number: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub currency: CurrencyCode,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to open an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_id: ProfileId,
    pub account_number: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub currency: CurrencyCode,
}

/// Partial account update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub balance: Option<Decimal>,
    pub status: Option<AccountStatus>,
    pub currency: Option<CurrencyCode>,
    pub account_type: Option<AccountType>,
}

impl AccountUpdate {
    /// Apply the update to an account in place.
    pub fn apply(&self, account: &mut Account) {
        if let Some(balance) = self.balance {
            account.balance = balance;
        }
        if let Some(status) = self.status {
            account.status = status;
        }
        if let Some(currency) = self.currency {
            account.currency = currency;
        }
        if let Some(account_type) = self.account_type {
            account.account_type = account_type;
        }
    }
}

/// Admin user listing row: a profile and everything it owns.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileWithAccounts {
    #[serde(flatten)]
    pub profile: Profile,
    pub accounts: Vec<Account>,
}
