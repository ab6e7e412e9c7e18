//! Business logic services.
//!
//! Services borrow the shared [`Repositories`](crate::db::Repositories) and
//! are constructed per request; they hold no state of their own.

pub mod accounts;
pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod storage;
pub mod users;

pub use accounts::{AccountError, AccountService, OpenAccount, generate_account_number};
pub use auth::{AuthError, AuthService};
pub use chat::{ChatError, ChatService, DEFAULT_CHAT_TITLE};
pub use dashboard::{AdminStats, CustomerDashboard, DashboardService, Growth, growth_rate};
pub use storage::{AvatarStore, StorageError};
pub use users::{CreateUser, UserError, UserService};
