//! Scope enforcement against an access policy.
//!
//! Two independent rules, checked in order:
//! 1. Row-level: when the patient table is referenced and the policy has a
//!    scope filter, the literal `<column> = <value>` must appear outside
//!    comments and literals.
//! 2. Column-level: no blocked column may be referenced anywhere.
//!
//! Finding a reference (patient table, blocked column) looks at both the
//! masked and the raw text, so a name hidden inside a comment or literal
//! still counts. Only the filter predicate must be found in masked text.
//!
//! The enforcer does not verify join correctness. A query over another table
//! that reaches patient rows without naming the patient table is outside what
//! a lexical check can see.

use crate::builder::Policy;
use crate::lexical::{
    contains_equality_filter, extract_tables, extract_tables_unmasked, word_positions,
};
use crate::outcome::{Rejection, ValidationOutcome};

/// Gate already safety-checked SQL against `policy`. Never rewrites the SQL.
pub fn enforce_scope(sql: &str, policy: &Policy) -> ValidationOutcome {
    if let Some(rejection) = check_row_scope(sql, policy) {
        return ValidationOutcome::Rejected(rejection);
    }
    if let Some(rejection) = check_blocked_columns(sql, policy) {
        return ValidationOutcome::Rejected(rejection);
    }
    ValidationOutcome::Accepted(sql.to_string())
}

fn check_row_scope(sql: &str, policy: &Policy) -> Option<Rejection> {
    let scope = policy.scope()?;
    let target = policy.scoped_table();

    let references_target = extract_tables(sql)
        .iter()
        .chain(extract_tables_unmasked(sql).iter())
        .any(|t| t.refers_to(target));
    if !references_target {
        return None;
    }

    if contains_equality_filter(sql, &scope.column, scope.value) {
        return None;
    }

    tracing::info!(
        role = %policy.role(),
        column = %scope.column,
        value = scope.value,
        "Scope filter missing from candidate SQL"
    );
    Some(Rejection::missing_scope_filter(
        &target.to_string(),
        &scope.column,
        scope.value,
    ))
}

/// The earliest blocked column in the statement text wins.
fn check_blocked_columns(sql: &str, policy: &Policy) -> Option<Rejection> {
    if policy.blocked_columns().is_empty() {
        return None;
    }

    let (column, _) = policy
        .blocked_columns()
        .iter()
        .filter_map(|column| {
            word_positions(sql, column)
                .first()
                .map(|pos| (column, *pos))
        })
        .min_by_key(|(_, pos)| *pos)?;

    tracing::info!(
        role = %policy.role(),
        column = %column,
        "Blocked column referenced in candidate SQL"
    );
    Some(Rejection::blocked_column(policy.role().as_str(), column))
}
