//! Configuration management for the MCP starter server.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default link opened by the `get_feedback` tool.
pub const DEFAULT_FEEDBACK_URL: &str =
    "https://github.com/SamMorrowDrums/mcp-starters/issues/new?template=workshop-feedback.yml";

/// Command-line arguments for the MCP starter server.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-starter")]
#[command(author = "MCP Starter Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Feature-complete MCP server with tools, resources, prompts, sampling and elicitation")]
pub struct Args {
    /// Transport mode: stdio or http
    #[arg(short, long, default_value = "stdio", env = "MCP_TRANSPORT")]
    pub transport: Transport,

    /// HTTP port (only for http transport)
    #[arg(short, long, default_value = "3000", env = "MCP_PORT")]
    pub port: u16,

    /// HTTP bind address (only for http transport)
    #[arg(long, default_value = "127.0.0.1", env = "MCP_HOST")]
    pub host: String,

    /// Enable debug logging
    #[arg(short, long, env = "MCP_DEBUG")]
    pub debug: bool,

    /// Log output format
    #[arg(long, default_value = "text", env = "MCP_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Greeting used by the hello tool
    #[arg(long, default_value = "Hello", env = "MCP_GREETING")]
    pub greeting: String,

    /// Seconds to wait for a client to answer sampling or elicitation (0 waits forever)
    #[arg(long, default_value = "300", env = "MCP_CLIENT_REQUEST_TIMEOUT")]
    pub client_request_timeout_secs: u64,

    /// Number of steps the long_task tool runs
    #[arg(long, default_value = "5", env = "MCP_LONG_TASK_STEPS")]
    pub long_task_steps: u32,

    /// Milliseconds each long_task step takes
    #[arg(long, default_value = "1000", env = "MCP_LONG_TASK_STEP_MS")]
    pub long_task_step_ms: u64,

    /// Feedback form opened by the get_feedback tool
    #[arg(long, default_value = DEFAULT_FEEDBACK_URL, env = "MCP_FEEDBACK_URL")]
    pub feedback_url: String,
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport mode
    pub transport: Transport,
    /// HTTP port
    pub port: u16,
    /// HTTP bind address
    pub host: String,
    /// Debug mode
    pub debug: bool,
    /// Log format
    pub log_format: LogFormat,
    /// Greeting for the hello tool
    pub greeting: String,
    /// Client request timeout in seconds, 0 for none
    pub client_request_timeout_secs: u64,
    /// Steps of long_task
    pub long_task_steps: u32,
    /// Duration of one long_task step in milliseconds
    pub long_task_step_ms: u64,
    /// Feedback form URL
    pub feedback_url: String,
}

impl Config {
    /// Bound on server-to-client requests, if any.
    pub fn client_request_timeout(&self) -> Option<Duration> {
        (self.client_request_timeout_secs > 0)
            .then(|| Duration::from_secs(self.client_request_timeout_secs))
    }

    /// Address the HTTP transport binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            transport: args.transport,
            port: args.port,
            host: args.host,
            debug: args.debug,
            log_format: args.log_format,
            greeting: args.greeting,
            client_request_timeout_secs: args.client_request_timeout_secs,
            long_task_steps: args.long_task_steps,
            long_task_step_ms: args.long_task_step_ms,
            feedback_url: args.feedback_url,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            port: 3000,
            host: "127.0.0.1".to_string(),
            debug: false,
            log_format: LogFormat::Text,
            greeting: "Hello".to_string(),
            client_request_timeout_secs: 300,
            long_task_steps: 5,
            long_task_step_ms: 1000,
            feedback_url: DEFAULT_FEEDBACK_URL.to_string(),
        }
    }
}
