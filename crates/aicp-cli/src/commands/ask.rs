//! `aicp ask`: interactive question loop for one logged-in user.

use aicp_core::PortalConfig;
use aicp_runtime::analysis::table::preview_markdown;
use aicp_runtime::{PipelineError, QueryReport, QueryRequest, SummaryKind};
use std::io::{BufRead, Write};
use std::process::ExitCode;

fn prompt(label: &str) -> anyhow::Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn is_quit(input: &str) -> bool {
    matches!(input.to_ascii_lowercase().as_str(), "quit" | "exit")
}

pub async fn run(config: PortalConfig, key: Option<String>) -> anyhow::Result<ExitCode> {
    println!("=== AICP Research Portal: policy-gated natural-language SQL ===\n");
    let services = aicp_server::connect_services(&config).await?;

    let key = match key {
        Some(key) => key,
        None => match prompt("Enter access key (or 'quit'): ")? {
            Some(key) if !key.is_empty() && !is_quit(&key) => key,
            _ => {
                println!("Goodbye.");
                return Ok(ExitCode::SUCCESS);
            }
        },
    };

    let ctx = match services.resolver.resolve(&key).await {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("\n[ERROR] Login failed: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let policy = match services.pipeline.policies().build(&ctx) {
        Ok(policy) => policy,
        Err(err) => {
            eprintln!("\n[ERROR] Login failed: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("\n[auth] Logged in as: {} (role={})", ctx.display_name, ctx.role);
    println!("[auth] Policy: {}", policy.notes());

    let preview_rows = config.limits.preview_rows;
    loop {
        let Some(question) = prompt("\nAsk a question about the database (or 'quit'): ")? else {
            println!("\nExiting.");
            break;
        };
        if question.is_empty() {
            continue;
        }
        if is_quit(&question) {
            println!("Goodbye.");
            break;
        }

        match services.pipeline.run(&ctx, &QueryRequest::new(question)).await {
            Ok(report) => print_report(&report, preview_rows),
            Err(err) => print_failure(&err),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_failure(err: &PipelineError) {
    match err {
        PipelineError::Rejected(rejection) => {
            println!("\n[POLICY] Could not produce an allowed SQL query.");
            println!("Reason: {} ({})", rejection.message, rejection.reason.code());
        }
        PipelineError::Generation(message) => {
            println!("\n[SQL ERROR] Could not generate a SQL query.");
            println!("Details: {message}");
        }
        PipelineError::Execution(message) => {
            println!("\n[DB ERROR] Database error while running the query.");
            println!("Details: {message}");
        }
        PipelineError::Configuration(err) => {
            println!("\n[CONFIG ERROR] {err}");
        }
    }
}

fn print_report(report: &QueryReport, preview_rows: usize) {
    println!("\n[SQL]\n{}", report.sql);
    println!("\n[Preview of results (up to {preview_rows} rows)]");
    println!("{}", preview_markdown(&report.result, preview_rows));
    if report.truncated() {
        println!("(result truncated at {} rows)", report.row_cap);
    }

    for summary in &report.summaries {
        let heading = match summary.kind {
            SummaryKind::Numeric => "Numeric summary",
            SummaryKind::Categorical => "Categorical summary",
            SummaryKind::Advanced => "Advanced analysis",
            SummaryKind::Narrative => "AI analysis",
        };
        println!("\n[{heading}]\n{}", summary.text);
        if let Some(error) = &summary.error {
            println!("(degraded: {error})");
        }
    }
    println!("\n({} rows in {} ms)", report.row_count(), report.execution_time_ms());
}
