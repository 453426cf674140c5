//! # aicp-policy
//!
//! Access policies and SQL gating for generated queries.
//!
//! This crate provides:
//! - [`PolicyBuilder`]: derives an immutable [`Policy`] from an [`AccessContext`]
//! - [`check_statement_safety`]: policy-agnostic statement-shape gate
//! - [`enforce_scope`]: row-level and column-level checks against a policy
//!
//! ## How It Works
//!
//! Candidate SQL is untrusted text. Validation is lexical, not grammar-based:
//! the gate strips code fences, checks the statement shape, then looks for the
//! scope predicate and blocked identifiers by pattern. SQL is never rewritten;
//! it is either accepted unchanged or rejected with a reason code.
//!
//! | Stage | Rejection reasons |
//! |-------|-------------------|
//! | Safety | `not_select`, `multi_statement`, `dangerous_keyword` |
//! | Scope  | `missing_scope_filter`, `blocked_column` |
//!
//! [`AccessContext`]: aicp_core::AccessContext

pub mod builder;
pub mod error;
pub mod lexical;
pub mod outcome;
pub mod safety;
pub mod scope;

pub use builder::{Policy, PolicyBuilder, ScopeFilter, build_policy};
pub use error::PolicyError;
pub use lexical::TableRef;
pub use outcome::{Rejection, RejectionCategory, RejectionReason, ValidationOutcome};
pub use safety::check_statement_safety;
pub use scope::enforce_scope;

/// Run the safety gate followed by the scope gate.
///
/// Returns the cleaned SQL when both pass. Scope checking only ever sees SQL
/// that already passed the safety gate.
pub fn validate(sql: &str, policy: &Policy) -> ValidationOutcome {
    match check_statement_safety(sql) {
        ValidationOutcome::Accepted(cleaned) => enforce_scope(&cleaned, policy),
        rejected => rejected,
    }
}
