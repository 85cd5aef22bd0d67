//! Mahakalp MCP bridge - main entry point.
//!
//! `serve` (default) resolves the session's entitlement once and then speaks
//! JSON-RPC on stdin/stdout. `status` prints a diagnostic account summary.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::json;

use mahakalp_mcp::client::ApiClient;
use mahakalp_mcp::entitlement::{self, ENTITLEMENT_CONTRACT_VERSION};
use mahakalp_mcp::rpc::StdioServer;
use mahakalp_mcp::tools::AccessGrant;
use mahakalp_mcp::types::{ApiConfig, Config, DEFAULT_BASE_URL, ENV_API_KEY, ENV_API_URL};

#[derive(Debug, Parser)]
#[command(name = "mahakalp-mcp", version, about = "Salesforce knowledge tools over MCP stdio")]
struct Cli {
    #[command(flatten)]
    api: ApiArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Args)]
struct ApiArgs {
    /// Base URL of the knowledge API.
    #[arg(long, env = ENV_API_URL, default_value = DEFAULT_BASE_URL, global = true)]
    api_url: String,

    /// Bearer credential; omit for anonymous free-tier access.
    #[arg(long, env = ENV_API_KEY, hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Retries after the first attempt for transient failures.
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Base retry delay in milliseconds (multiplied by the attempt number).
    #[arg(long, global = true)]
    retry_delay_ms: Option<u64>,
}

impl ApiArgs {
    fn into_config(self) -> ApiConfig {
        let defaults = ApiConfig::default();
        let timeout = self
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout);
        let retry_delay = self
            .retry_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_delay);

        ApiConfig::new(self.api_url)
            .with_api_key(self.api_key)
            .with_timeout(timeout)
            .with_retries(self.max_retries.unwrap_or(defaults.max_retries), retry_delay)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve MCP tools on stdin/stdout (default).
    Serve,
    /// Print API health, tier info and the resolved allow-set as JSON.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config {
        api: cli.api.into_config(),
        ..Config::default()
    };

    // Initialize observability
    mahakalp_mcp::observability::init_tracing(&config.observability);

    let client = ApiClient::new(config.api.clone())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(client, config).await,
        Command::Status => status(client).await,
    }
}

async fn serve(client: ApiClient, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        base_url = %config.api.base_url,
        authenticated = config.api.api_key.is_some(),
        "mahakalp-mcp {} starting",
        env!("CARGO_PKG_VERSION")
    );

    let grant = AccessGrant::establish(&client).await;
    let server = StdioServer::new(client, grant, config.server);

    let cancel = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            cancel.cancel();
        }
    });

    server.serve_stdio().await?;
    Ok(())
}

async fn status(client: ApiClient) -> Result<(), Box<dyn std::error::Error>> {
    let healthy = client.health_check().await;
    let tier_info = match entitlement::fetch_tier_info(&client).await {
        Ok(info) => serde_json::to_value(info)?,
        Err(err) => json!({ "error": err.to_string() }),
    };
    let grant = AccessGrant::establish(&client).await;

    let report = json!({
        "healthy": healthy,
        "tier_info": tier_info,
        "entitlement_contract": ENTITLEMENT_CONTRACT_VERSION,
        "entitlement": grant.entitlement(),
        "effective_tier": grant.effective_tier(),
        "allowed_tools": grant.allowed(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "mahakalp-mcp",
            "--api-url",
            "http://localhost:9000/",
            "--timeout-ms",
            "250",
            "--max-retries",
            "0",
            "status",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Command::Status)));

        let api = cli.api.into_config();
        assert_eq!(api.base_url, "http://localhost:9000");
        assert_eq!(api.timeout, Duration::from_millis(250));
        assert_eq!(api.max_retries, 0);
        assert_eq!(api.retry_delay, ApiConfig::default().retry_delay);
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
