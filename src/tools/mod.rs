//! MCP tool implementations.
//!
//! - `greeting` - Connectivity and enum-validation demos (2 tools)
//! - `weather` - Simulated weather with structured output (1 tool)
//! - `sampling` - Asks the client's model a question (1 tool)
//! - `long_task` - Reports progress while it works (1 tool)
//! - `dynamic` - Loads a calculator at runtime (1 tool, +1 loaded later)
//! - `elicitation` - Asks the user for input mid-call (2 tools)

pub mod dynamic;
pub mod elicitation;
pub mod greeting;
pub mod long_task;
pub mod sampling;
pub mod weather;

use std::time::Duration;

use crate::config::Config;
use crate::mcp::handler::ToolRegistry;

/// Register all startup tools with the registry.
///
/// `bonus_calculator` is deliberately absent; `load_bonus_tool` adds it.
pub fn register_all_tools(registry: &ToolRegistry, config: &Config) {
    // Greeting & demos (4)
    registry.register_tool(greeting::HelloTool::new(config.greeting.clone()));
    registry.register_tool(greeting::ChooseColorTool);
    registry.register_tool(weather::WeatherTool);
    registry.register_tool(long_task::LongTaskTool::new(
        config.long_task_steps,
        Duration::from_millis(config.long_task_step_ms),
    ));

    // LLM interaction (1)
    registry.register_tool(sampling::AskLlmTool);

    // Dynamic features (1)
    registry.register_tool(dynamic::LoadBonusTool);

    // Elicitation (2)
    registry.register_tool(elicitation::ConfirmActionTool);
    registry.register_tool(elicitation::FeedbackTool::new(config.feedback_url.clone()));
}
