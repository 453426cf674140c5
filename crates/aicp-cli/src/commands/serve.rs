//! `aicp serve`: run the HTTP API.

use aicp_core::PortalConfig;
use std::process::ExitCode;

pub async fn run(config: PortalConfig, bind: Option<String>) -> anyhow::Result<ExitCode> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let services = aicp_server::connect_services(&config).await?;
    let state = services.into_state(&config);
    aicp_server::serve(state, &bind).await?;
    Ok(ExitCode::SUCCESS)
}
