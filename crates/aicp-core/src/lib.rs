//! Shared types for the AICP query gateway.
//!
//! The identity model is intentionally small: an authenticated session resolves
//! to an [`AccessContext`], which carries a closed [`Role`] plus at most one
//! scope identifier. Everything downstream (policy building, SQL gating) is a
//! pure function of that context.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Configuration types shared across all AICP crates
pub mod config;

pub use config::{
    AccessConfig, ConfigError, DatabaseConfig, LimitsConfig, LlmConfig, LoggingConfig,
    PortalConfig, ServerConfig,
};

/// Hard upper bound on rows any query may return, regardless of caller input.
pub const HARD_MAX_RESULT_ROWS: usize = 1000;

/// Patient columns holding direct identifying data, blocked for the pharmacy role.
pub const SENSITIVE_PATIENT_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "street_address",
    "street_address_2",
    "city",
    "province",
    "postal",
    "health_card_number",
    "home_phone",
    "cell_phone",
    "email",
    "birth",
    "health_card_expiry_date",
];

/// Portal role. The set is closed; adding a variant forces every match to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Pharmacy,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Pharmacy => "pharmacy",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored role value is not one of the supported roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported role '{0}'")]
pub struct UnsupportedRole(pub String);

impl FromStr for Role {
    type Err = UnsupportedRole;

    /// Parses a stored role value; surrounding whitespace and case are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doctor" => Ok(Role::Doctor),
            "pharmacy" => Ok(Role::Pharmacy),
            "admin" => Ok(Role::Admin),
            _ => Err(UnsupportedRole(s.to_string())),
        }
    }
}

/// Resolved identity for one authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    pub user_id: i64,
    pub display_name: String,
    pub role: Role,
    /// Scope for the doctor role.
    pub doctor_id: Option<i64>,
    /// Scope for the pharmacy role.
    pub pharmacy_id: Option<i64>,
}

impl AccessContext {
    pub fn doctor(user_id: i64, display_name: impl Into<String>, doctor_id: i64) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            role: Role::Doctor,
            doctor_id: Some(doctor_id),
            pharmacy_id: None,
        }
    }

    pub fn pharmacy(user_id: i64, display_name: impl Into<String>, pharmacy_id: i64) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            role: Role::Pharmacy,
            doctor_id: None,
            pharmacy_id: Some(pharmacy_id),
        }
    }

    pub fn admin(user_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            role: Role::Admin,
            doctor_id: None,
            pharmacy_id: None,
        }
    }

    /// The scope identifier relevant to this context's role, if any.
    pub fn scope_id(&self) -> Option<i64> {
        match self.role {
            Role::Doctor => self.doctor_id,
            Role::Pharmacy => self.pharmacy_id,
            Role::Admin => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_and_whitespace_insensitively() {
        assert_eq!(" Doctor ".parse::<Role>(), Ok(Role::Doctor));
        assert_eq!("PHARMACY".parse::<Role>(), Ok(Role::Pharmacy));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "nurse".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported role 'nurse'");
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Pharmacy).unwrap(), "\"pharmacy\"");
    }

    #[test]
    fn scope_id_follows_role() {
        assert_eq!(AccessContext::doctor(1, "Dr A", 7).scope_id(), Some(7));
        assert_eq!(AccessContext::pharmacy(2, "Rx", 3).scope_id(), Some(3));

        let mut admin = AccessContext::admin(9, "Admin");
        admin.doctor_id = Some(4);
        assert_eq!(admin.scope_id(), None);
    }
}
