//! Read-only rollups for the admin console and customer dashboard.
//!
//! Everything is recomputed per request; nothing is cached.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use ledgerdesk_core::{AccountStatus, ChatStatus, CurrencyCode, ProfileId};

use crate::db::{CountWindow, Repositories, RepositoryError};
use crate::models::Account;

/// Month-over-month growth percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Growth {
    pub users: f64,
    pub accounts: f64,
    pub chats: f64,
}

/// Admin console statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStats {
    /// Profiles with role `user`.
    pub total_users: i64,
    /// Accounts that are not suspended.
    pub total_accounts: i64,
    /// Balance sum over the same accounts, across currencies.
    pub total_balance: Decimal,
    pub active_chats: i64,
    pub total_messages: i64,
    /// Unseen messages addressed to the requesting admin.
    pub unseen_messages: i64,
    pub growth: Growth,
}

/// Balance total for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyTotal {
    pub currency: CurrencyCode,
    pub balance: Decimal,
}

/// Customer dashboard summary.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerDashboard {
    pub accounts: Vec<Account>,
    /// Active-account balances grouped by currency, ordered by code.
    pub totals: Vec<CurrencyTotal>,
    pub unseen_messages: i64,
}

/// Percentage change from `prior` to `current`, rounded to one decimal.
///
/// With no prior activity, any current activity counts as 100% growth.
#[must_use]
#[allow(clippy::cast_precision_loss)] // counts stay far below 2^52
pub fn growth_rate(prior: i64, current: i64) -> f64 {
    match (prior, current) {
        (0, 0) => 0.0,
        (0, _) => 100.0,
        _ => {
            let rate = (current - prior) as f64 / prior as f64 * 100.0;
            (rate * 10.0).round() / 10.0
        }
    }
}

/// `(prior month, current month)` calendar windows containing `now`, in UTC.
#[must_use]
pub fn month_windows(now: DateTime<Utc>) -> (CountWindow, CountWindow) {
    let this_month = now.date_naive().with_day(1).unwrap_or_else(|| now.date_naive());
    let prior_month = this_month
        .checked_sub_months(Months::new(1))
        .unwrap_or(this_month);
    let next_month = this_month
        .checked_add_months(Months::new(1))
        .unwrap_or(this_month);

    (
        CountWindow {
            start: midnight(prior_month),
            end: midnight(this_month),
        },
        CountWindow {
            start: midnight(this_month),
            end: midnight(next_month),
        },
    )
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Dashboard service over the shared repositories.
pub struct DashboardService<'a> {
    repos: &'a Repositories,
}

impl<'a> DashboardService<'a> {
    /// Create a new dashboard service.
    #[must_use]
    pub const fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    /// Compute admin statistics as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if any count fails.
    #[instrument(skip(self))]
    pub async fn admin_stats(
        &self,
        admin_id: ProfileId,
        now: DateTime<Utc>,
    ) -> Result<AdminStats, RepositoryError> {
        let (prior, current) = month_windows(now);

        let total_users = self.repos.profiles.count_users(None).await?;
        let totals = self.repos.accounts.totals().await?;
        let active_chats = self.repos.chats.count_by_status(ChatStatus::Active).await?;
        let total_messages = self.repos.messages.count_all().await?;
        let unseen_messages = self.repos.messages.count_unseen_for(admin_id).await?;

        let growth = Growth {
            users: growth_rate(
                self.repos.profiles.count_users(Some(prior)).await?,
                self.repos.profiles.count_users(Some(current)).await?,
            ),
            accounts: growth_rate(
                self.repos.accounts.count_created(prior).await?,
                self.repos.accounts.count_created(current).await?,
            ),
            chats: growth_rate(
                self.repos.chats.count_created(prior).await?,
                self.repos.chats.count_created(current).await?,
            ),
        };

        Ok(AdminStats {
            total_users,
            total_accounts: totals.count,
            total_balance: totals.balance,
            active_chats,
            total_messages,
            unseen_messages,
            growth,
        })
    }

    /// Summarize one customer's accounts and unread support messages.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    #[instrument(skip(self))]
    pub async fn customer_summary(
        &self,
        user_id: ProfileId,
    ) -> Result<CustomerDashboard, RepositoryError> {
        let accounts = self.repos.accounts.list_for_user(user_id).await?;
        let unseen_messages = self.repos.messages.count_unseen_for(user_id).await?;

        Ok(CustomerDashboard {
            totals: active_totals(&accounts),
            accounts,
            unseen_messages,
        })
    }
}

fn active_totals(accounts: &[Account]) -> Vec<CurrencyTotal> {
    let mut by_currency: BTreeMap<&'static str, CurrencyTotal> = BTreeMap::new();
    for account in accounts.iter().filter(|a| a.status == AccountStatus::Active) {
        by_currency
            .entry(account.currency.code())
            .or_insert_with(|| CurrencyTotal {
                currency: account.currency,
                balance: Decimal::ZERO,
            })
            .balance += account.balance;
    }
    by_currency.into_values().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;
    use ledgerdesk_core::{AccountType, Email, Role};

    use super::*;
    use crate::models::{AccountUpdate, NewAccount, NewProfile};

    #[test]
    fn test_growth_rate_edges() {
        assert_eq!(growth_rate(0, 0), 0.0);
        assert_eq!(growth_rate(0, 7), 100.0);
        assert_eq!(growth_rate(5, 10), 100.0);
        assert_eq!(growth_rate(10, 5), -50.0);
        assert_eq!(growth_rate(3, 4), 33.3);
        assert_eq!(growth_rate(3, 5), 66.7);
    }

    #[test]
    fn test_month_windows() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 30, 0).unwrap();
        let (prior, current) = month_windows(now);

        assert_eq!(prior.start, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(prior.end, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(current.start, prior.end);
        assert_eq!(current.end, Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
        assert!(current.contains(now));
    }

    #[test]
    fn test_month_windows_cross_year() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 5).unwrap();
        let (prior, _) = month_windows(now);
        assert_eq!(prior.start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
    }

    async fn seed(repos: &Repositories) -> (ProfileId, ProfileId) {
        let admin = repos
            .profiles
            .create(NewProfile {
                id: ProfileId::generate(),
                full_name: "Ada Admin".to_string(),
                email: Email::parse("ada@bank.test").unwrap(),
                role: Role::Admin,
                created_by_admin_id: None,
                phone: None,
            })
            .await
            .unwrap();
        let user = repos
            .profiles
            .create(NewProfile {
                id: ProfileId::generate(),
                full_name: "Uma User".to_string(),
                email: Email::parse("uma@bank.test").unwrap(),
                role: Role::User,
                created_by_admin_id: Some(admin.id),
                phone: None,
            })
            .await
            .unwrap();

        let opening = [
            ("100.50", CurrencyCode::USD),
            ("20.25", CurrencyCode::USD),
            ("9.00", CurrencyCode::EUR),
        ];
        for (balance, currency) in opening {
            repos
                .accounts
                .create(NewAccount {
                    user_id: user.id,
                    account_number: "0000000001".to_string(),
                    account_type: AccountType::Checking,
                    balance: Decimal::from_str(balance).unwrap(),
                    currency,
                })
                .await
                .unwrap();
        }

        (admin.id, user.id)
    }

    #[tokio::test]
    async fn test_admin_stats_excludes_suspended_accounts() {
        let repos = Repositories::in_memory();
        let (admin, user) = seed(&repos).await;
        let eur = repos
            .accounts
            .list_for_user(user)
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.currency == CurrencyCode::EUR)
            .unwrap();
        repos
            .accounts
            .update(
                eur.id,
                &AccountUpdate {
                    status: Some(AccountStatus::Suspended),
                    ..AccountUpdate::default()
                },
            )
            .await
            .unwrap();

        let stats = DashboardService::new(&repos)
            .admin_stats(admin, Utc::now())
            .await
            .unwrap();

        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_accounts, 2);
        assert_eq!(stats.total_balance, Decimal::from_str("120.75").unwrap());
        assert_eq!(stats.active_chats, 0);
        assert_eq!(stats.growth.users, 100.0);
        assert_eq!(stats.growth.accounts, 100.0);
        assert_eq!(stats.growth.chats, 0.0);
    }

    #[tokio::test]
    async fn test_customer_totals_group_active_accounts() {
        let repos = Repositories::in_memory();
        let (_, user) = seed(&repos).await;

        let summary = DashboardService::new(&repos)
            .customer_summary(user)
            .await
            .unwrap();

        assert_eq!(summary.accounts.len(), 3);
        assert_eq!(
            summary.totals,
            vec![
                CurrencyTotal {
                    currency: CurrencyCode::EUR,
                    balance: Decimal::from_str("9.00").unwrap(),
                },
                CurrencyTotal {
                    currency: CurrencyCode::USD,
                    balance: Decimal::from_str("120.75").unwrap(),
                },
            ]
        );
        assert_eq!(summary.unseen_messages, 0);
    }
}
