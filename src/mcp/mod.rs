//! Model Context Protocol (MCP) implementation.
//!
//! This module provides the capability registries, the tool dispatcher and
//! the per-connection session that carries progress, sampling and
//! elicitation back to the client.
//!
//! # Architecture
//!
//! - `protocol` - Core MCP types and message definitions
//! - `registry` - Copy-on-write registry shared by tools, resources and prompts
//! - `schema` - Argument schemas and validation
//! - `dispatcher` - Tool lookup, validation and execution
//! - `session` - Per-connection state and server-to-client requests
//! - `context` - What a running tool handler can reach
//! - `server` - JSON-RPC method routing
//! - `transport` - Transport layer (stdio, in-memory)

pub mod context;
pub mod dispatcher;
pub mod elicitation;
pub mod handler;
pub mod progress;
pub mod prompts;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod schema;
pub mod server;
pub mod session;
pub mod transport;

pub use context::ToolContext;
pub use dispatcher::{Dispatcher, Invocation};
pub use handler::{ToolHandler, ToolRegistry};
pub use protocol::*;
pub use server::McpServer;
pub use session::Session;
pub use transport::{memory_transport, MemoryClient, MemoryTransport, StdioTransport, Transport};
