//! `aicp check`: run the gates on a statement offline.

use aicp_core::{PortalConfig, Role};
use aicp_policy::{PolicyBuilder, ValidationOutcome, validate};
use std::io::Read;
use std::process::ExitCode;

use super::offline_context;

pub fn run(
    config: &PortalConfig,
    role: Role,
    scope_id: Option<i64>,
    sql: Option<String>,
) -> anyhow::Result<ExitCode> {
    let sql = match sql {
        Some(sql) => sql,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let policy = PolicyBuilder::new(config.access.clone()).build(&offline_context(role, scope_id))?;
    let outcome = validate(&sql, &policy);
    println!("{}", render(&outcome));
    Ok(if outcome.is_accepted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

pub fn render(outcome: &ValidationOutcome) -> String {
    match outcome {
        ValidationOutcome::Accepted(sql) => format!("ACCEPTED\n{sql}"),
        ValidationOutcome::Rejected(rejection) => {
            let mut out = format!(
                "REJECTED ({}) [{}] {}",
                rejection.reason.category().as_str(),
                rejection.reason.code(),
                rejection.message
            );
            if let Some(detail) = &rejection.detail {
                out.push_str(&format!("\n  offending: {detail}"));
            }
            out
        }
    }
}
