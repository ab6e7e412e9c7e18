//! LedgerDesk Core - Shared domain types.
//!
//! This crate provides the types shared by every LedgerDesk component:
//! - `server` - JSON API for the admin console and the customer dashboard
//! - `cli` - Command-line tools for migrations and admin bootstrapping
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Database encoding is available behind the `postgres`
//! feature so the server can bind these types directly in queries.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money, roles and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
