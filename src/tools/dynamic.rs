//! Dynamic tool loading.
//!
//! `load_bonus_tool` adds `bonus_calculator` to the registry it was itself
//! looked up from. Calls that start after it returns can use the new tool.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::mcp::context::ToolContext;
use crate::mcp::handler::{
    error_result, parse_args, structured_result, success_result, Arguments, ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolAnnotations, ToolResult};
use crate::mcp::schema::{FieldSchema, ObjectSchema};

pub const BONUS_TOOL_NAME: &str = "bonus_calculator";

/// Registers [`CalculatorTool`] on first use.
pub struct LoadBonusTool;

#[async_trait]
impl ToolHandler for LoadBonusTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "load_bonus_tool".to_string(),
            title: Some("Load Bonus Tool".to_string()),
            description: "Dynamically loads a bonus tool that wasn't available at startup"
                .to_string(),
            input_schema: ObjectSchema::new(),
            output_schema: None,
            annotations: Some(ToolAnnotations {
                title: Some("Load Bonus Tool".to_string()),
                read_only_hint: Some(false),
                destructive_hint: Some(false),
                idempotent_hint: Some(true),
                open_world_hint: Some(false),
            }),
        }
    }

    async fn execute(&self, ctx: &ToolContext, _args: Arguments) -> Result<ToolResult> {
        // Concurrent loads race on the registry; only one of them wins.
        if !ctx.register_new_tool(Arc::new(CalculatorTool)) {
            return Ok(success_result(format!(
                "Bonus tool is already loaded! Try calling '{}'.",
                BONUS_TOOL_NAME
            )));
        }

        Ok(success_result(format!(
            "Bonus tool '{}' has been loaded! Refresh your tools list to see it.",
            BONUS_TOOL_NAME
        )))
    }
}

/// Arithmetic operation of the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    /// Apply the operation; `None` for division by zero.
    pub fn apply(self, a: f64, b: f64) -> Option<f64> {
        match self {
            Self::Add => Some(a + b),
            Self::Subtract => Some(a - b),
            Self::Multiply => Some(a * b),
            Self::Divide if b == 0.0 => None,
            Self::Divide => Some(a / b),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize)]
struct CalculatorInput {
    a: f64,
    b: f64,
    operation: Operation,
}

/// Four-function calculator, loaded at runtime.
pub struct CalculatorTool;

#[async_trait]
impl ToolHandler for CalculatorTool {
    fn definition(&self) -> Tool {
        Tool {
            name: BONUS_TOOL_NAME.to_string(),
            title: Some("Bonus Calculator".to_string()),
            description: "A calculator that was dynamically loaded".to_string(),
            input_schema: ObjectSchema::new()
                .required_field("a", FieldSchema::number().description("First number"))
                .required_field("b", FieldSchema::number().description("Second number"))
                .required_field(
                    "operation",
                    FieldSchema::string()
                        .description("Arithmetic operation to perform")
                        .one_of(["add", "subtract", "multiply", "divide"]),
                ),
            output_schema: Some(
                ObjectSchema::new().required_field("result", FieldSchema::number()),
            ),
            annotations: Some(ToolAnnotations::read_only("Bonus Calculator", true)),
        }
    }

    async fn execute(&self, _ctx: &ToolContext, args: Arguments) -> Result<ToolResult> {
        let input: CalculatorInput = parse_args(args)?;

        match input.operation.apply(input.a, input.b) {
            Some(result) => Ok(structured_result(
                format!("{} {} {} = {}", input.a, input.operation, input.b, result),
                json!({ "result": result }),
            )),
            None => Ok(error_result("Error: division by zero")),
        }
    }
}
