//! Record types persisted by the store.
//!
//! Serialized field names are camelCase to match the web client.

use chrono::{DateTime, Utc};
use policy::{Principal, Role};
use serde::{Deserialize, Serialize};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    #[serde(rename = "isBlocked")]
    pub blocked: bool,
    #[serde(rename = "subscriptionEndDate")]
    pub subscription_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The attributes the access gate decides on.
    pub fn principal(&self) -> Principal {
        Principal::new(self.role, self.blocked, self.subscription_end)
    }
}

/// Fields supplied when creating an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub dosage: String,
    /// Time of day, `HH:MM`.
    pub time: String,
    /// Free text such as "Daily" or "Weekly".
    pub frequency: String,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedication {
    pub name: String,
    pub dosage: String,
    pub time: String,
    pub frequency: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub user_id: i64,
    /// Doctor or purpose.
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A recorded panic-button press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanicLog {
    pub id: i64,
    pub user_id: i64,
    pub triggered_at: DateTime<Utc>,
}
