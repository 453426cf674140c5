//! `aicp policy`: show what a role may see.

use aicp_core::{PortalConfig, Role};
use aicp_policy::{Policy, PolicyBuilder};
use std::process::ExitCode;

use super::offline_context;

pub fn run(config: &PortalConfig, role: Role, scope_id: Option<i64>) -> anyhow::Result<ExitCode> {
    let policy = PolicyBuilder::new(config.access.clone()).build(&offline_context(role, scope_id))?;
    println!("{}", render(&policy));
    Ok(ExitCode::SUCCESS)
}

pub fn render(policy: &Policy) -> String {
    let mut out = format!("role: {}\n", policy.role());
    match policy.scope() {
        Some(scope) => out.push_str(&format!(
            "row filter: {}.{} = {}\n",
            policy.scoped_table(),
            scope.column,
            scope.value
        )),
        None => out.push_str("row filter: none\n"),
    }
    if policy.blocked_columns().is_empty() {
        out.push_str("blocked columns: none\n");
    } else {
        let cols: Vec<&str> = policy.blocked_columns().iter().map(String::as_str).collect();
        out.push_str(&format!("blocked columns: {}\n", cols.join(", ")));
    }
    out.push_str(&format!("notes: {}\n\nhint:\n{}", policy.notes(), policy.scope_filter_hint()));
    out
}
