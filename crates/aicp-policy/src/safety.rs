//! Statement-shape gate.
//!
//! Policy-agnostic: this gate never consults the role. It accepts exactly one
//! SELECT statement free of denylisted keywords and returns the cleaned text.

use regex::Regex;
use std::sync::LazyLock;

use crate::lexical::strip_code_fences;
use crate::outcome::{Rejection, ValidationOutcome};

/// Keywords that must never appear as a whole word in a candidate statement.
pub const DENYLISTED_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "CREATE", "EXEC", "EXECUTE",
    "MERGE", "GRANT", "REVOKE",
];

static SELECT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*select\b").expect("valid select regex"));

static DENYLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", DENYLISTED_KEYWORDS.join("|")))
        .expect("valid denylist regex")
});

/// A `GO` batch separator on its own line.
static BATCH_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*go\s*$").expect("valid batch separator regex"));

/// Check that `sql` is a single, read-only SELECT statement.
///
/// Steps, in order: strip code fences, reject statement chaining, require a
/// leading SELECT, reject denylisted keywords and batch separators.
pub fn check_statement_safety(sql: &str) -> ValidationOutcome {
    let cleaned = strip_code_fences(sql);

    if has_multiple_statements(&cleaned) {
        tracing::debug!("rejecting candidate: multiple statements");
        return ValidationOutcome::Rejected(Rejection::multi_statement());
    }

    if !SELECT_PREFIX.is_match(&cleaned) {
        tracing::debug!("rejecting candidate: not a SELECT");
        return ValidationOutcome::Rejected(Rejection::not_select(&cleaned));
    }

    if let Some(found) = DENYLIST.find(&cleaned) {
        let keyword = found.as_str().to_ascii_uppercase();
        tracing::debug!(keyword = %keyword, "rejecting candidate: denylisted keyword");
        return ValidationOutcome::Rejected(Rejection::dangerous_keyword(&keyword));
    }

    if BATCH_SEPARATOR.is_match(&cleaned) {
        tracing::debug!("rejecting candidate: batch separator");
        return ValidationOutcome::Rejected(Rejection::dangerous_keyword("GO"));
    }

    ValidationOutcome::Accepted(cleaned)
}

/// Whether a semicolon remains after dropping one optional trailing semicolon.
fn has_multiple_statements(cleaned: &str) -> bool {
    let body = cleaned.trim_end();
    let body = body.strip_suffix(';').unwrap_or(body);
    body.contains(';')
}
