//! Greeting and enum-validation tools.

use async_trait::async_trait;

use crate::error::Result;
use crate::mcp::context::ToolContext;
use crate::mcp::handler::{get_string_arg, success_result, Arguments, ToolHandler};
use crate::mcp::protocol::{Tool, ToolAnnotations, ToolResult};
use crate::mcp::schema::{FieldSchema, ObjectSchema};

/// Says hello.
pub struct HelloTool {
    greeting: String,
}

impl HelloTool {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for HelloTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "hello".to_string(),
            title: Some("Say Hello".to_string()),
            description: "A friendly greeting tool that says hello to someone".to_string(),
            input_schema: ObjectSchema::new().required_field(
                "name",
                FieldSchema::string().description("The name to greet"),
            ),
            output_schema: None,
            annotations: Some(ToolAnnotations::read_only("Say Hello", true)),
        }
    }

    async fn execute(&self, _ctx: &ToolContext, args: Arguments) -> Result<ToolResult> {
        let name = get_string_arg(&args, "name")?;
        Ok(success_result(format!(
            "{}, {}! Welcome to MCP.",
            self.greeting, name
        )))
    }
}

/// Picks one of a fixed set of colors; the schema enforces the set.
pub struct ChooseColorTool;

#[async_trait]
impl ToolHandler for ChooseColorTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "choose_color".to_string(),
            title: Some("Choose a color".to_string()),
            description: "Choose a color from a predefined set of options".to_string(),
            input_schema: ObjectSchema::new().required_field(
                "color",
                FieldSchema::string()
                    .description("The color to choose")
                    .one_of(["red", "green", "blue"]),
            ),
            output_schema: None,
            annotations: Some(ToolAnnotations::read_only("Choose a color", true)),
        }
    }

    async fn execute(&self, _ctx: &ToolContext, args: Arguments) -> Result<ToolResult> {
        let color = get_string_arg(&args, "color")?;
        Ok(success_result(format!("You chose the color: {}", color)))
    }
}
