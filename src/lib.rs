//! MCP Starter Server - Rust Implementation
//!
//! A Model Context Protocol server built around a runtime-mutable
//! capability registry. Tools, resources and prompts are looked up by name,
//! arguments are checked against each tool's schema before its handler
//! runs, and a running handler can call back into the client mid-request.
//!
//! # Architecture
//!
//! 1. **MCP Layer** (`mcp`) - Registries, dispatcher, session, transports
//! 2. **Tools Layer** (`tools`) - Example tools for every sub-protocol
//! 3. **HTTP Layer** (`http`) - Axum front end with SSE progress streaming
//! 4. **Ambient** (`config`, `metrics`, `error`)
//!
//! # Features
//!
//! - **Progress**: Monotonic progress notifications tied to a caller token
//! - **Sampling**: Handlers ask the client's model for a completion
//! - **Elicitation**: Form and link requests with a closed three-way outcome
//! - **Dynamic Registration**: Handlers add tools while other calls run

pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod metrics;
pub mod tools;

pub use error::{Error, Result};

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Guidance sent to the client in the `initialize` result.
pub const INSTRUCTIONS: &str = r#"# MCP Rust Starter Server

A demonstration MCP server covering tools, resources, prompts, progress,
sampling, elicitation and dynamic tool loading.

## Available Tools

### Greeting & Demos
- **hello**: Simple greeting - use to test connectivity
- **choose_color**: Pick red, green or blue - shows enum validation
- **get_weather**: Returns simulated weather as text and structured content
- **long_task**: Reports progress notifications while it runs

### LLM Interaction
- **ask_llm**: Asks the client's model a question (requires sampling support)

### Dynamic Features
- **load_bonus_tool**: Adds a calculator tool at runtime
- **bonus_calculator**: Available after calling load_bonus_tool

### Elicitation (User Input)
- **confirm_action**: Asks the user to confirm through a form
- **get_feedback**: Sends the user to a feedback form by link

## Available Resources

- **about://server**: Server information
- **doc://example**: Sample document
- **greeting://{name}**: Personalized greeting template
- **item://{id}**: Item data by ID

## Available Prompts

- **greet**: Generates a personalized greeting
- **code_review**: Structured code review prompt

## Recommended Workflows

1. **Testing Connection**: Call hello with your name
2. **Weather Demo**: Call get_weather to see structured output
3. **Progress Demo**: Call long_task with a progress token
4. **Dynamic Loading**: Call load_bonus_tool, then list tools again
5. **Elicitation Demo**: Call confirm_action or get_feedback

## Tool Annotations

Every tool declares whether it modifies state (readOnlyHint), whether it
is safe to retry (idempotentHint) and whether it reaches systems outside
the server (openWorldHint). Use these hints to decide how to call it."#;
