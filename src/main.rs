//! MCP Starter Server - Rust Implementation
//!
//! Serves the example tools, resources and prompts over stdio or HTTP.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mcp_starter_rs::config::{Args, Config, LogFormat, Transport};
use mcp_starter_rs::error::Result;
use mcp_starter_rs::mcp::server::McpServer;
use mcp_starter_rs::mcp::transport::StdioTransport;
use mcp_starter_rs::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();
    // Hosting platforms usually hand out the port as plain PORT.
    if std::env::var_os("MCP_PORT").is_none() {
        if let Some(port) = std::env::var_os("PORT") {
            std::env::set_var("MCP_PORT", port);
        }
    }
    let args = Args::parse();

    // Build configuration from args
    let config: Config = args.into();
    init_tracing(&config);

    info!("MCP Starter Server v{}", VERSION);
    info!("Transport: {:?}", config.transport);

    let server = McpServer::bootstrap(&config);

    match config.transport {
        Transport::Stdio => {
            info!("Starting stdio transport...");
            tokio::select! {
                result = server.run(StdioTransport::new()) => result?,
                _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
            }
        }
        Transport::Http => {
            info!("Starting HTTP transport on {}...", config.bind_addr());
            mcp_starter_rs::http::start_server(&config, server).await?;
        }
    }

    Ok(())
}

/// Log to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
