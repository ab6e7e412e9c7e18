//! Domain models for profiles, accounts, and support chat.

pub mod account;
pub mod chat;
pub mod profile;
pub mod session;

pub use account::{Account, AccountUpdate, NewAccount, ProfileWithAccounts};
pub use chat::{Chat, ChatSummary, Message, MessageView, NewMessage};
pub use profile::{AuthIdentity, NewProfile, Profile, ProfileUpdate};
pub use session::{Caller, SessionProfile, session_keys};
