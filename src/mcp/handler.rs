//! Tool handlers and the tool registry.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::{Error, Result};
use crate::mcp::context::ToolContext;
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};
use crate::mcp::registry::Registry;
use crate::metrics::Metrics;

/// Validated tool arguments.
pub type Arguments = Map<String, Value>;

/// Handler for MCP tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Execute the tool with arguments already checked against its input schema.
    ///
    /// Domain failures belong in an error result. Returning `Err` is
    /// reserved for faults.
    async fn execute(&self, ctx: &ToolContext, args: Arguments) -> Result<ToolResult>;
}

/// Registry of tool handlers keyed by tool name.
pub type ToolRegistry = Registry<Tool, dyn ToolHandler>;

impl Registry<Tool, dyn ToolHandler> {
    /// Register a tool handler under the name in its definition.
    pub fn register_tool<T: ToolHandler + 'static>(&self, handler: T) {
        self.register_arc(Arc::new(handler));
    }

    /// Register a tool handler (Arc version).
    pub fn register_arc(&self, handler: Arc<dyn ToolHandler>) {
        let tool = handler.definition();
        self.register(tool.name.clone(), tool, handler);
    }
}

/// Narrow handle that lets a running tool add tools to its own registry.
#[derive(Clone)]
pub struct ToolRegistrar {
    registry: Arc<ToolRegistry>,
    metrics: Arc<Metrics>,
}

impl ToolRegistrar {
    pub fn new(registry: Arc<ToolRegistry>, metrics: Arc<Metrics>) -> Self {
        Self { registry, metrics }
    }

    /// Register a tool; visible to every lookup that starts after this returns.
    pub fn register(&self, handler: Arc<dyn ToolHandler>) {
        let name = handler.definition().name;
        self.registry.register_arc(handler);
        self.metrics.inc_dynamic_registrations();
        info!("Dynamically registered tool: {}", name);
    }

    /// Register a tool only if no tool of that name exists yet.
    ///
    /// Returns `false`, leaving the existing tool in place, when the name
    /// is taken.
    pub fn register_new(&self, handler: Arc<dyn ToolHandler>) -> bool {
        let tool = handler.definition();
        let name = tool.name.clone();
        if !self.registry.register_if_absent(name.clone(), tool, handler) {
            return false;
        }
        self.metrics.inc_dynamic_registrations();
        info!("Dynamically registered tool: {}", name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name)
    }
}

/// Helper to create a text content block.
pub fn text_content(text: impl Into<String>) -> ContentBlock {
    ContentBlock::Text { text: text.into() }
}

/// Helper to create a successful tool result.
pub fn success_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        structured_content: None,
        is_error: false,
    }
}

/// Helper to create an error tool result.
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        structured_content: None,
        is_error: true,
    }
}

/// Helper to create a successful result carrying a structured payload.
pub fn structured_result(text: impl Into<String>, structured: Value) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        structured_content: Some(structured),
        is_error: false,
    }
}

/// Helper to extract a required string argument.
pub fn get_string_arg(args: &Arguments, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| Error::InvalidArgument(format!("missing required field '{}'", name)))
}

/// Helper to extract an optional string argument.
pub fn get_optional_string_arg(args: &Arguments, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(String::from)
}

/// Helper to extract a required numeric argument.
pub fn get_number_arg(args: &Arguments, name: &str) -> Result<f64> {
    args.get(name)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| Error::InvalidArgument(format!("missing required field '{}'", name)))
}

/// Helper to extract an integer argument with a default.
pub fn get_int_arg(args: &Arguments, name: &str, default: i64) -> i64 {
    args.get(name).and_then(|v| v.as_i64()).unwrap_or(default)
}

/// Deserialize the whole argument map into a typed struct.
pub fn parse_args<T: DeserializeOwned>(args: Arguments) -> Result<T> {
    serde_json::from_value(Value::Object(args)).map_err(|e| Error::InvalidArgument(e.to_string()))
}
