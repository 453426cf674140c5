//! Policy construction.
//!
//! A [`Policy`] is a pure function of an [`AccessContext`] and the access
//! configuration. It is built fresh for every request and never cached, so a
//! scope cannot leak from one user to another.

use aicp_core::{AccessConfig, AccessContext, Role};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::PolicyError;
use crate::lexical::TableRef;

/// Required row filter: `<column> = <value>` on the patient table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeFilter {
    pub column: String,
    pub value: i64,
}

/// Immutable access policy derived from an access context.
///
/// Either a scope filter is present (column and value both set) or it is
/// absent (both unset); the two halves cannot diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policy {
    role: Role,
    scope: Option<ScopeFilter>,
    blocked_columns: BTreeSet<String>,
    scoped_table: TableRef,
    scope_filter_hint: String,
    notes: String,
}

impl Policy {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn scope(&self) -> Option<&ScopeFilter> {
        self.scope.as_ref()
    }

    pub fn required_filter_column(&self) -> Option<&str> {
        self.scope.as_ref().map(|s| s.column.as_str())
    }

    pub fn required_filter_value(&self) -> Option<i64> {
        self.scope.as_ref().map(|s| s.value)
    }

    /// Lower-cased column names the role may not reference.
    pub fn blocked_columns(&self) -> &BTreeSet<String> {
        &self.blocked_columns
    }

    /// The table whose rows the scope filter restricts.
    pub fn scoped_table(&self) -> &TableRef {
        &self.scoped_table
    }

    /// Guidance handed to the text generator describing the required filter.
    pub fn scope_filter_hint(&self) -> &str {
        &self.scope_filter_hint
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}

/// Builds policies using the configured patient table and scope columns.
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    access: AccessConfig,
}

impl PolicyBuilder {
    pub fn new(access: AccessConfig) -> Self {
        Self { access }
    }

    /// Derive the policy for `ctx`.
    ///
    /// Fails when a doctor or pharmacy context has no scope identifier.
    pub fn build(&self, ctx: &AccessContext) -> Result<Policy, PolicyError> {
        let scoped_table = TableRef::new(Some(&self.access.schema), &self.access.patient_table);
        let table = self.access.qualified_patient_table();

        let policy = match ctx.role {
            Role::Doctor => {
                let doctor_id = ctx.doctor_id.ok_or(PolicyError::MissingScopeId {
                    role: Role::Doctor,
                    field: "doctor_id",
                })?;
                let column = &self.access.doctor_filter_column;
                Policy {
                    role: Role::Doctor,
                    scope: Some(ScopeFilter {
                        column: column.clone(),
                        value: doctor_id,
                    }),
                    blocked_columns: BTreeSet::new(),
                    scoped_table,
                    scope_filter_hint: format!(
                        "Row-level rule: Only include patients where {table}.{column} = {doctor_id}.\n\
                         If querying other tables with patient_id, JOIN to {table} and apply that filter."
                    ),
                    notes: format!(
                        "Doctor can access patient-level data, but only within their {column} scope."
                    ),
                }
            }
            Role::Pharmacy => {
                let pharmacy_id = ctx.pharmacy_id.ok_or(PolicyError::MissingScopeId {
                    role: Role::Pharmacy,
                    field: "pharmacy_id",
                })?;
                let column = &self.access.pharmacy_filter_column;
                Policy {
                    role: Role::Pharmacy,
                    scope: Some(ScopeFilter {
                        column: column.clone(),
                        value: pharmacy_id,
                    }),
                    blocked_columns: self
                        .access
                        .pii_columns
                        .iter()
                        .map(|c| c.trim().to_ascii_lowercase())
                        .filter(|c| !c.is_empty())
                        .collect(),
                    scoped_table,
                    scope_filter_hint: format!(
                        "Row-level rule: Only include patients where {table}.{column} = {pharmacy_id}.\n\
                         If querying other tables with patient_id, JOIN to {table} and apply that filter.\n\
                         Column-level rule: Do NOT select patient PII (names, address, phones, email, health card, birth date)."
                    ),
                    notes: "Pharmacy should primarily analyze clinical/utilization info. Patient PII is blocked."
                        .to_string(),
                }
            }
            Role::Admin => Policy {
                role: Role::Admin,
                scope: None,
                blocked_columns: BTreeSet::new(),
                scoped_table,
                scope_filter_hint: "Admin rule: Full access to all tables and rows. \
                                    No row-level scope filters required."
                    .to_string(),
                notes: "Admin can access all data (including patient-level and PII).".to_string(),
            },
        };

        tracing::debug!(
            user_id = ctx.user_id,
            role = %policy.role,
            scoped = policy.scope.is_some(),
            blocked_columns = policy.blocked_columns.len(),
            "Built access policy"
        );

        Ok(policy)
    }
}

/// Build a policy with the default access configuration.
pub fn build_policy(ctx: &AccessContext) -> Result<Policy, PolicyError> {
    PolicyBuilder::default().build(ctx)
}
