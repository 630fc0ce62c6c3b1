use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role. Exactly one per identity; independent of the blocked flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    Standard,
    #[serde(rename = "admin")]
    Administrator,
}

impl Role {
    /// Name used on the wire and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "user",
            Role::Administrator => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::Standard),
            "admin" => Some(Role::Administrator),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Access tier a route declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityClass {
    /// Anyone, signed in or not.
    Public,
    /// A live, unblocked subscription, or an administrator.
    StandardGated,
    /// Administrators only, whatever their subscription or block state.
    AdminOnly,
}

/// The attributes of an identity the gate reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub role: Role,
    pub blocked: bool,
    pub subscription_end: DateTime<Utc>,
}

impl Principal {
    pub fn new(role: Role, blocked: bool, subscription_end: DateTime<Utc>) -> Self {
        Self {
            role,
            blocked,
            subscription_end,
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}
