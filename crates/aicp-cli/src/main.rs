use aicp_core::{PortalConfig, Role};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "aicp", version, about = "AICP research portal: policy-gated natural-language SQL")]
struct Cli {
    /// YAML configuration file. Defaults apply when omitted.
    #[arg(long, short, global = true, env = "AICP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API.
    Serve {
        /// Override `server.bind`, e.g. 127.0.0.1:8000
        #[arg(long)]
        bind: Option<String>,
    },

    /// Log in with an access key and ask questions interactively.
    Ask {
        /// Access key. Prompted for when omitted.
        #[arg(long, env = "AICP_API_KEY", hide_env_values = true)]
        key: Option<String>,
    },

    /// Run the safety and scope gates on a SQL statement without a database.
    Check {
        #[arg(long)]
        role: Role,

        /// doctor_id or pharmacy_id, depending on the role.
        #[arg(long = "scope-id")]
        scope_id: Option<i64>,

        /// Statement to check. Read from stdin when omitted.
        #[arg(long)]
        sql: Option<String>,
    },

    /// Print the policy a role would get.
    Policy {
        #[arg(long)]
        role: Role,

        #[arg(long = "scope-id")]
        scope_id: Option<i64>,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = PortalConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging.level);

    match cli.cmd {
        Command::Serve { bind } => commands::serve::run(config, bind).await,
        Command::Ask { key } => commands::ask::run(config, key).await,
        Command::Check {
            role,
            scope_id,
            sql,
        } => commands::check::run(&config, role, scope_id, sql),
        Command::Policy { role, scope_id } => commands::policy::run(&config, role, scope_id),
    }
}
