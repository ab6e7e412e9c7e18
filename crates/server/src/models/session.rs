//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use ledgerdesk_core::{ProfileId, Role};

/// Session-stored identity of the logged-in profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProfile {
    pub id: ProfileId,
    pub role: Role,
}

/// Who is making the current request, resolved against the stored profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated { id: ProfileId, role: Role },
}

impl Caller {
    /// Whether the caller is a logged-in admin.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Authenticated { role: Role::Admin, .. })
    }
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in profile.
    pub const CURRENT_PROFILE: &str = "current_profile";
}
