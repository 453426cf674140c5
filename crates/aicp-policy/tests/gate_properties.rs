//! Behavioural checks for the policy builder and the two SQL gates.

use aicp_core::{AccessContext, Role, SENSITIVE_PATIENT_COLUMNS};
use aicp_policy::{
    RejectionReason, ValidationOutcome, build_policy, check_statement_safety, enforce_scope,
    validate,
};
use pretty_assertions::assert_eq;

#[test]
fn doctor_policies_scope_by_family_doctor() {
    for doctor_id in [1, 5, 42, 9_999] {
        let policy = build_policy(&AccessContext::doctor(1, "Dr", doctor_id)).unwrap();
        assert_eq!(policy.required_filter_column(), Some("family_dr_id"));
        assert_eq!(policy.required_filter_value(), Some(doctor_id));
        assert!(policy.blocked_columns().is_empty());
    }
}

#[test]
fn pharmacy_policies_block_the_pii_set() {
    for pharmacy_id in [1, 3, 77] {
        let policy = build_policy(&AccessContext::pharmacy(2, "Rx", pharmacy_id)).unwrap();
        assert_eq!(policy.role(), Role::Pharmacy);
        assert_eq!(policy.required_filter_column(), Some("pharmacy_id"));
        assert!(!policy.blocked_columns().is_empty());
        for column in SENSITIVE_PATIENT_COLUMNS {
            assert!(policy.blocked_columns().contains(*column));
        }
    }
}

#[test]
fn scoped_count_is_accepted() {
    let policy = build_policy(&AccessContext::doctor(1, "Dr", 5)).unwrap();
    let sql = "SELECT COUNT(*) FROM dbo.patients WHERE family_dr_id = 5";
    assert_eq!(
        enforce_scope(sql, &policy),
        ValidationOutcome::Accepted(sql.to_string())
    );
}

#[test]
fn unscoped_count_is_rejected() {
    let policy = build_policy(&AccessContext::doctor(1, "Dr", 5)).unwrap();
    let outcome = enforce_scope("SELECT COUNT(*) FROM dbo.patients", &policy);
    let ValidationOutcome::Rejected(rejection) = outcome else {
        panic!("expected rejection");
    };
    assert_eq!(rejection.reason, RejectionReason::MissingScopeFilter);
    assert!(rejection.message.contains("family_dr_id = 5"));
}

#[test]
fn blocked_column_rejected_even_with_scope_filter() {
    let policy = build_policy(&AccessContext::pharmacy(2, "Rx", 3)).unwrap();
    let outcome = enforce_scope(
        "SELECT first_name FROM dbo.patients WHERE pharmacy_id = 3",
        &policy,
    );
    let ValidationOutcome::Rejected(rejection) = outcome else {
        panic!("expected rejection");
    };
    assert_eq!(rejection.reason, RejectionReason::BlockedColumn);
    assert!(rejection.message.contains("first_name"));
}

#[test]
fn another_doctors_scope_is_rejected() {
    let policy = build_policy(&AccessContext::doctor(1, "Dr", 5)).unwrap();
    let outcome = enforce_scope(
        "SELECT COUNT(*) FROM dbo.patients WHERE family_dr_id = 6",
        &policy,
    );
    assert_eq!(outcome.reason(), Some(RejectionReason::MissingScopeFilter));
}

#[test]
fn admin_passes_any_safe_select() {
    let policy = build_policy(&AccessContext::admin(9, "Admin")).unwrap();
    let sql = "SELECT first_name, email FROM dbo.patients";
    assert!(enforce_scope(sql, &policy).is_accepted());
}

#[test]
fn enforcement_is_idempotent() {
    let policy = build_policy(&AccessContext::pharmacy(2, "Rx", 3)).unwrap();
    let cases = [
        "SELECT COUNT(*) FROM dbo.patients WHERE pharmacy_id = 3",
        "SELECT COUNT(*) FROM dbo.patients",
        "SELECT email FROM dbo.patients WHERE pharmacy_id = 3",
    ];
    for sql in cases {
        let first = enforce_scope(sql, &policy);
        for _ in 0..5 {
            assert_eq!(enforce_scope(sql, &policy), first);
        }
    }
}

#[test]
fn safety_gate_accepts_fenced_selects() {
    let outcome =
        check_statement_safety("```sql\nSELECT TOP 5 * FROM dbo.patients WHERE family_dr_id = 7\n```");
    let sql = outcome.accepted_sql().unwrap();
    assert!(sql.to_lowercase().starts_with("select"));
    assert!(!sql.contains("```"));
    assert!(sql.contains("family_dr_id = 7"));
}

#[test]
fn safety_gate_rejection_reasons() {
    let cases = [
        ("DELETE FROM dbo.patients", RejectionReason::NotSelect),
        ("SELECT 1; DROP TABLE dbo.patients;", RejectionReason::MultiStatement),
        ("SELECT * FROM dbo.patients WHERE 1 = 1 OR merge = 1", RejectionReason::DangerousKeyword),
        ("  grant select on dbo.patients to public", RejectionReason::NotSelect),
    ];
    for (sql, expected) in cases {
        assert_eq!(check_statement_safety(sql).reason(), Some(expected), "{sql}");
    }
}

#[test]
fn full_gate_for_pharmacy_aggregate() {
    let policy = build_policy(&AccessContext::pharmacy(2, "Rx", 3)).unwrap();
    let raw = "```sql\nSELECT p.sex, COUNT(*) AS n\nFROM dbo.patients p\nWHERE p.pharmacy_id = 3\nGROUP BY p.sex\n```";
    assert!(validate(raw, &policy).is_accepted());
}

/// Quoting forms that contain a stray `'`. A trailing comment carries the
/// matching quote, so a naive literal masker would hide everything between.
const QUOTE_TRICKS: &[&str] = &[
    "1 AS \"x'\"",
    "1 AS [x']",
    r"E'\''",
    "$$'$$",
    "$tag$'$tag$",
];

#[test]
fn quoting_tricks_do_not_hide_the_patient_table() {
    let policy = build_policy(&AccessContext::doctor(1, "Dr", 5)).unwrap();
    for trick in QUOTE_TRICKS {
        let sql = format!("SELECT {trick}, p.* FROM dbo.patients p -- '");
        assert_eq!(
            enforce_scope(&sql, &policy).reason(),
            Some(RejectionReason::MissingScopeFilter),
            "{sql}"
        );
    }
}

#[test]
fn quoting_tricks_do_not_hide_blocked_columns() {
    let policy = build_policy(&AccessContext::pharmacy(2, "Rx", 3)).unwrap();
    for trick in QUOTE_TRICKS {
        let sql = format!(
            "SELECT {trick}, first_name, email FROM dbo.patients WHERE pharmacy_id = 3 -- '"
        );
        let ValidationOutcome::Rejected(rejection) = enforce_scope(&sql, &policy) else {
            panic!("expected rejection for {sql}");
        };
        assert_eq!(rejection.reason, RejectionReason::BlockedColumn, "{sql}");
        assert_eq!(rejection.detail.as_deref(), Some("first_name"), "{sql}");
    }
}

#[test]
fn pharmacy_scope_is_required_despite_quoting_tricks() {
    let policy = build_policy(&AccessContext::pharmacy(2, "Rx", 3)).unwrap();
    for trick in QUOTE_TRICKS {
        let sql = format!("SELECT {trick}, COUNT(*) FROM dbo.patients -- '");
        assert_eq!(
            enforce_scope(&sql, &policy).reason(),
            Some(RejectionReason::MissingScopeFilter),
            "{sql}"
        );
    }
}

#[test]
fn from_only_is_still_row_checked() {
    let doctor = build_policy(&AccessContext::doctor(1, "Dr", 5)).unwrap();
    assert_eq!(
        enforce_scope("SELECT * FROM ONLY dbo.patients", &doctor).reason(),
        Some(RejectionReason::MissingScopeFilter)
    );

    let pharmacy = build_policy(&AccessContext::pharmacy(2, "Rx", 3)).unwrap();
    assert_eq!(
        enforce_scope("SELECT email FROM ONLY dbo.patients WHERE pharmacy_id = 3", &pharmacy).reason(),
        Some(RejectionReason::BlockedColumn)
    );
}

#[test]
fn scoped_query_with_quoted_identifiers_is_accepted() {
    let policy = build_policy(&AccessContext::doctor(1, "Dr", 5)).unwrap();
    let sql = "SELECT $$visits$$ AS \"label\", COUNT(*) FROM ONLY dbo.patients WHERE \"family_dr_id\" = 5";
    assert_eq!(
        enforce_scope(sql, &policy),
        ValidationOutcome::Accepted(sql.to_string())
    );
}
