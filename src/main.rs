//! Draft Email MCP Server
//!
//! A Model Context Protocol (MCP) server that lists unread Gmail messages and
//! drafts replies to them.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use draft_email_mcp::config::Config;
use draft_email_mcp::gmail::auth::Authenticator;
use draft_email_mcp::gmail::client::GmailClient;
use draft_email_mcp::gmail::mailbox::Mailbox;
use draft_email_mcp::mcp::gateway::ToolGateway;
use draft_email_mcp::mcp::server::McpServer;
use draft_email_mcp::mcp::tools;

/// Draft Email MCP Server
#[derive(Parser)]
#[command(name = "draft-email-server")]
#[command(author, version, about = "Draft Email MCP Server - read unread Gmail and draft replies")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Authenticate with Gmail (run this first)
    Auth,
    /// Print the tool descriptors as JSON
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Tools => {
            let tools = serde_json::to_string_pretty(&tools::list_tools())?;
            println!("{}", tools);
        }
        Commands::Auth => {
            let config = Config::new().context("loading configuration")?;
            let authenticator = Authenticator::new(config)
                .await
                .context("loading OAuth client secrets")?;
            authenticator
                .authenticate_interactive()
                .await
                .context("interactive authentication")?;
            eprintln!("Authentication completed successfully!");
        }
        Commands::Serve => {
            let config = Config::new().context("loading configuration")?;
            run_server(config).await?;
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    config.find_and_copy_oauth_keys()?;
    if !config.oauth_keys_exist() {
        bail!(
            "OAuth client secrets not found. Place credentials.json in the current directory or {}, or set GOOGLE_CREDENTIALS_PATH",
            config.config_dir.display()
        );
    }

    let api_base_url = config.api_base_url.clone();
    let authenticator = Authenticator::with_keys_file(config)
        .await
        .context("loading OAuth client secrets")?;

    if !authenticator.is_authenticated().await {
        bail!("Not authenticated. Please run 'draft-email-server auth' first.");
    }

    let client = GmailClient::connect_to(&api_base_url, Arc::new(authenticator))
        .await
        .context("acquiring Gmail session")?;

    let mailbox = Arc::new(Mailbox::new(Arc::new(client)));
    let gateway = Arc::new(ToolGateway::new(mailbox));

    let mut server = McpServer::new(gateway);
    server.run_stdio().await?;

    Ok(())
}
