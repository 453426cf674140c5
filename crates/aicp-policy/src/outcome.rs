//! Validation outcomes and rejection reasons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a candidate statement was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    // ===== Safety gate =====
    /// First keyword is not SELECT.
    NotSelect,
    /// More than one statement (semicolon chaining).
    MultiStatement,
    /// A denylisted keyword or batch separator appears as a whole word.
    DangerousKeyword,

    // ===== Scope gate =====
    /// The patient table is referenced without the required equality filter.
    MissingScopeFilter,
    /// A column blocked for the role is referenced.
    BlockedColumn,
}

/// Which gate produced a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCategory {
    Safety,
    Scope,
}

impl RejectionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Scope => "scope",
        }
    }
}

impl RejectionReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotSelect => "not_select",
            Self::MultiStatement => "multi_statement",
            Self::DangerousKeyword => "dangerous_keyword",
            Self::MissingScopeFilter => "missing_scope_filter",
            Self::BlockedColumn => "blocked_column",
        }
    }

    pub fn category(&self) -> RejectionCategory {
        match self {
            Self::NotSelect | Self::MultiStatement | Self::DangerousKeyword => {
                RejectionCategory::Safety
            }
            Self::MissingScopeFilter | Self::BlockedColumn => RejectionCategory::Scope,
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A rejected candidate: reason code plus a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub message: String,
    /// The offending keyword, column or filter, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Rejection {
    pub fn new(reason: RejectionReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Create a non-SELECT rejection.
    pub fn not_select(sql: &str) -> Self {
        Self::new(
            RejectionReason::NotSelect,
            format!(
                "Only a single SELECT statement is allowed, blocked: {}",
                excerpt(sql)
            ),
        )
    }

    /// Create a multi-statement rejection.
    pub fn multi_statement() -> Self {
        Self::new(
            RejectionReason::MultiStatement,
            "Query contains more than one statement; statement chaining is not allowed",
        )
    }

    /// Create a denylisted keyword rejection.
    pub fn dangerous_keyword(keyword: &str) -> Self {
        Self::new(
            RejectionReason::DangerousKeyword,
            format!("Query contains disallowed keyword '{}'", keyword),
        )
        .with_detail(keyword)
    }

    /// Create a missing scope filter rejection.
    pub fn missing_scope_filter(table: &str, column: &str, value: i64) -> Self {
        Self::new(
            RejectionReason::MissingScopeFilter,
            format!(
                "Query references {} but is missing the required scope filter {} = {}",
                table, column, value
            ),
        )
        .with_detail(format!("{} = {}", column, value))
    }

    /// Create a blocked column rejection.
    pub fn blocked_column(role: &str, column: &str) -> Self {
        Self::new(
            RejectionReason::BlockedColumn,
            format!(
                "Column '{}' is not accessible to the {} role",
                column, role
            ),
        )
        .with_detail(column)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.reason, self.message)
    }
}

impl std::error::Error for Rejection {}

/// Result of running a gate over candidate SQL. There is no partial acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The (cleaned) SQL passed and may move to the next stage unchanged.
    Accepted(String),
    Rejected(Rejection),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted(_))
    }

    pub fn accepted_sql(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Accepted(sql) => Some(sql),
            ValidationOutcome::Rejected(_) => None,
        }
    }

    pub fn reason(&self) -> Option<RejectionReason> {
        match self {
            ValidationOutcome::Accepted(_) => None,
            ValidationOutcome::Rejected(r) => Some(r.reason),
        }
    }

    pub fn into_result(self) -> Result<String, Rejection> {
        match self {
            ValidationOutcome::Accepted(sql) => Ok(sql),
            ValidationOutcome::Rejected(r) => Err(r),
        }
    }
}

fn excerpt(sql: &str) -> String {
    const MAX: usize = 160;
    match sql.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(RejectionReason::NotSelect.code(), "not_select");
        assert_eq!(RejectionReason::MissingScopeFilter.code(), "missing_scope_filter");
        assert_eq!(RejectionReason::BlockedColumn.category(), RejectionCategory::Scope);
        assert_eq!(RejectionReason::MultiStatement.category(), RejectionCategory::Safety);
    }

    #[test]
    fn not_select_message_is_truncated() {
        let long = format!("DELETE {}", "x".repeat(400));
        let r = Rejection::not_select(&long);
        assert!(r.message.ends_with("..."));
        assert!(r.message.len() < 260);
    }

    #[test]
    fn rejection_display_includes_code() {
        let r = Rejection::blocked_column("pharmacy", "email");
        assert_eq!(
            r.to_string(),
            "[blocked_column] Column 'email' is not accessible to the pharmacy role"
        );
        assert_eq!(r.detail.as_deref(), Some("email"));
    }
}
