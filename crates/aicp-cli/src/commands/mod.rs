//! `aicp` subcommands.

pub mod ask;
pub mod check;
pub mod policy;
pub mod serve;

use aicp_core::{AccessContext, Role};

/// A synthetic access context for offline commands.
pub fn offline_context(role: Role, scope_id: Option<i64>) -> AccessContext {
    AccessContext {
        user_id: 0,
        display_name: format!("offline {role}"),
        role,
        doctor_id: scope_id.filter(|_| role == Role::Doctor),
        pharmacy_id: scope_id.filter(|_| role == Role::Pharmacy),
    }
}
