//! Error types for policy construction.

use aicp_core::Role;
use thiserror::Error;

/// Errors raised while building a policy from an access context.
///
/// These are configuration failures: the stored user record is missing the
/// scope identifier its role requires. They are never defaulted away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A scoped role has no scope identifier.
    #[error("{role} user must have {field} set in the users table")]
    MissingScopeId { role: Role, field: &'static str },
}

impl PolicyError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            PolicyError::MissingScopeId { .. } => "configuration_error",
        }
    }
}
