//! Input contracts.
//!
//! A route with an [`InputContract`] has its body checked before the handler
//! runs; the first violation becomes a 400 response.

use crate::api::InputContract;
use crate::handlers::admin::BlockToggle;
use chrono::NaiveTime;
use identity::{Credentials, Registration};
use serde::Serialize;
use serde::de::DeserializeOwned;
use storage::{NewAppointment, NewMedication};

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    fn from_json(err: serde_json::Error) -> Self {
        let text = err.to_string();
        // serde names the offending field between backticks.
        let field = if text.starts_with("missing field") || text.starts_with("unknown field") {
            text.split('`').nth(1).map(str::to_string)
        } else {
            None
        };
        Self {
            message: format!("Invalid request body: {text}"),
            field,
        }
    }
}

/// Semantic checks beyond what deserialization enforces.
pub trait Validate {
    fn validate(&self) -> Result<(), Violation>;
}

impl InputContract {
    /// Parse `body` as this contract's type and validate it.
    pub fn check(&self, body: &[u8]) -> Result<(), Violation> {
        match self {
            InputContract::Registration => check::<Registration>(body),
            InputContract::Credentials => check::<Credentials>(body),
            InputContract::NewMedication => check::<NewMedication>(body),
            InputContract::NewAppointment => check::<NewAppointment>(body),
            InputContract::BlockToggle => check::<BlockToggle>(body),
        }
    }
}

fn check<T: DeserializeOwned + Validate>(body: &[u8]) -> Result<(), Violation> {
    let value: T = serde_json::from_slice(body).map_err(Violation::from_json)?;
    value.validate()
}

fn required(field: &str, value: &str, message: &str) -> Result<(), Violation> {
    if value.trim().is_empty() {
        Err(Violation::field(field, message))
    } else {
        Ok(())
    }
}

impl Validate for Registration {
    fn validate(&self) -> Result<(), Violation> {
        required("username", &self.username, "Username is required")?;
        required("password", &self.password, "Password is required")?;
        required("fullName", &self.full_name, "Full name is required")
    }
}

impl Validate for Credentials {
    fn validate(&self) -> Result<(), Violation> {
        required("username", &self.username, "Username is required")?;
        required("password", &self.password, "Password is required")
    }
}

impl Validate for NewMedication {
    fn validate(&self) -> Result<(), Violation> {
        required("name", &self.name, "Medication name is required")?;
        required("dosage", &self.dosage, "Dosage is required")?;
        if self.time.len() != 5 || NaiveTime::parse_from_str(&self.time, "%H:%M").is_err() {
            return Err(Violation::field("time", "Time must be in HH:MM format"));
        }
        required("frequency", &self.frequency, "Frequency is required")
    }
}

impl Validate for NewAppointment {
    fn validate(&self) -> Result<(), Violation> {
        required("title", &self.title, "Title is required")
    }
}

impl Validate for BlockToggle {
    fn validate(&self) -> Result<(), Violation> {
        Ok(())
    }
}
