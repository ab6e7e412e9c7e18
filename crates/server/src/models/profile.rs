//! Profile and credential models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use ledgerdesk_core::{Email, ProfileId, Role};

/// Application-level identity of a customer or admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: ProfileId,
    pub full_name: String,
    pub email: Email,
    pub role: Role,
    /// Admin who provisioned this profile; support chats are routed to them.
    pub created_by_admin_id: Option<ProfileId>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a profile.
#[derive(Debug, Clone)]
pub struct NewProfile {
    /// Shared with the [`AuthIdentity`] created alongside it.
    pub id: ProfileId,
    pub full_name: String,
    pub email: Email,
    pub role: Role,
    pub created_by_admin_id: Option<ProfileId>,
    pub phone: Option<String>,
}

/// Partial update applied by an admin. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

impl ProfileUpdate {
    /// Apply the update to a profile in place.
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(full_name) = &self.full_name {
            profile.full_name.clone_from(full_name);
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(role) = self.role {
            profile.role = role;
        }
    }
}

/// Credential record backing password login.
///
/// Never serialized: the password hash must not leave the server.
#[derive(Clone)]
pub struct AuthIdentity {
    pub id: ProfileId,
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
}

impl std::fmt::Debug for AuthIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthIdentity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}
