//! A slow task that reports progress.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};
use crate::mcp::context::ToolContext;
use crate::mcp::handler::{get_string_arg, success_result, Arguments, ToolHandler};
use crate::mcp::protocol::{Tool, ToolAnnotations, ToolResult};
use crate::mcp::schema::{FieldSchema, ObjectSchema};

/// Runs `steps` steps of `step` each, reporting progress before every step.
pub struct LongTaskTool {
    steps: u32,
    step: Duration,
}

impl LongTaskTool {
    pub fn new(steps: u32, step: Duration) -> Self {
        Self {
            steps: steps.max(1),
            step,
        }
    }
}

#[async_trait]
impl ToolHandler for LongTaskTool {
    fn definition(&self) -> Tool {
        let total = self.step.saturating_mul(self.steps);
        Tool {
            name: "long_task".to_string(),
            title: Some("Long Running Task".to_string()),
            description: format!(
                "A task that takes {} seconds and reports progress along the way",
                total.as_secs()
            ),
            input_schema: ObjectSchema::new().required_field(
                "taskName",
                FieldSchema::string().description("Name for this task"),
            ),
            output_schema: None,
            annotations: Some(ToolAnnotations::read_only("Long Running Task", true)),
        }
    }

    async fn execute(&self, ctx: &ToolContext, args: Arguments) -> Result<ToolResult> {
        let task_name = get_string_arg(&args, "taskName")?;
        let steps = self.steps as usize;

        for i in 0..steps {
            if let Some(progress) = ctx.progress() {
                let message = format!("Step {}/{}", i + 1, steps);
                progress.report_step(i, steps, Some(message.as_str()));
            }
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("Task {:?} cancelled at step {}/{}", task_name, i + 1, steps);
                    return Err(Error::Cancelled);
                }
                _ = tokio::time::sleep(self.step) => {}
            }
        }

        if let Some(progress) = ctx.progress() {
            progress.complete(Some("Complete!"));
        }

        Ok(success_result(format!(
            "Task \"{}\" completed successfully after {} steps!",
            task_name, steps
        )))
    }
}
