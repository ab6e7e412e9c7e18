//! Role and status enums for profiles, accounts, chats and messages.
//!
//! Every enum here round-trips through the same lowercase `snake_case`
//! spelling in JSON, in `PostgreSQL` enum types, and in `Display`/`FromStr`,
//! so a value read from a request path or body can be compared against a
//! stored value without translation.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a variant of one of these enums.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct InvalidVariant {
    /// Which enum was being parsed (e.g. "chat status").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `as_str`, `Display`, and `FromStr` from one variant table.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The canonical lowercase spelling.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = InvalidVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(InvalidVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Profile role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Bank customer using the dashboard.
    #[default]
    User,
    /// Staff member using the admin console.
    Admin,
}

string_enum!(Role, "role", { User => "user", Admin => "admin" });

impl Role {
    /// Whether this role may use the admin console.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Account status, set by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Disabled,
    Suspended,
}

string_enum!(AccountStatus, "account status", {
    Active => "active",
    Disabled => "disabled",
    Suspended => "suspended",
});

/// Kind of account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
}

string_enum!(AccountType, "account type", {
    Checking => "checking",
    Savings => "savings",
});

/// Support chat lifecycle state.
///
/// ```text
/// active ──close──▶ closed        (admin_id cleared)
///   ▲  └──park───▶ pending        (admin_id cleared)
///   └──── activate ◀─┘            (admin_id = acting admin)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "chat_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
    #[default]
    Active,
    Closed,
    Pending,
}

string_enum!(ChatStatus, "chat status", {
    Active => "active",
    Closed => "closed",
    Pending => "pending",
});

impl ChatStatus {
    /// Whether this status keeps an admin assigned to the chat.
    #[must_use]
    pub const fn keeps_assignment(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Kind of chat message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "message_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    File,
    Image,
}

string_enum!(MessageType, "message type", {
    Text => "text",
    File => "file",
    Image => "image",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_status_parse() {
        assert_eq!("active".parse::<ChatStatus>().unwrap(), ChatStatus::Active);
        assert_eq!(" closed ".parse::<ChatStatus>().unwrap(), ChatStatus::Closed);
        assert_eq!("pending".parse::<ChatStatus>().unwrap(), ChatStatus::Pending);

        let err = "archived".parse::<ChatStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid chat status: archived");
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("Active".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn test_display_matches_serde() {
        for status in AccountStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
        for kind in MessageType::ALL {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_only_active_keeps_assignment() {
        assert!(ChatStatus::Active.keeps_assignment());
        assert!(!ChatStatus::Closed.keeps_assignment());
        assert!(!ChatStatus::Pending.keeps_assignment());
    }

    #[test]
    fn test_role() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
        assert_eq!(Role::default(), Role::User);
    }
}
