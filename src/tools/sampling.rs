//! Sampling: the tool asks the client's model.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mcp::context::ToolContext;
use crate::mcp::handler::{error_result, get_int_arg, get_string_arg, success_result, Arguments, ToolHandler};
use crate::mcp::protocol::{CreateMessageParams, SamplingMessage, Tool, ToolAnnotations, ToolResult};
use crate::mcp::schema::{FieldSchema, ObjectSchema};

const DEFAULT_MAX_TOKENS: i64 = 100;

/// Forwards a prompt to the client's model.
pub struct AskLlmTool;

#[async_trait]
impl ToolHandler for AskLlmTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "ask_llm".to_string(),
            title: Some("Ask LLM".to_string()),
            description: "Ask the connected LLM a question using sampling".to_string(),
            input_schema: ObjectSchema::new()
                .required_field(
                    "prompt",
                    FieldSchema::string().description("The question or prompt for the LLM"),
                )
                .field(
                    "maxTokens",
                    FieldSchema::integer()
                        .description("Maximum tokens in response")
                        .default_value(DEFAULT_MAX_TOKENS),
                ),
            output_schema: None,
            annotations: Some(ToolAnnotations::read_only("Ask LLM", false)),
        }
    }

    async fn execute(&self, ctx: &ToolContext, args: Arguments) -> Result<ToolResult> {
        let prompt = get_string_arg(&args, "prompt")?;
        let max_tokens = match get_int_arg(&args, "maxTokens", DEFAULT_MAX_TOKENS) {
            n if n <= 0 => DEFAULT_MAX_TOKENS,
            n => n,
        };

        let params = CreateMessageParams {
            messages: vec![SamplingMessage::user(prompt)],
            max_tokens: u32::try_from(max_tokens).unwrap_or(u32::MAX),
            system_prompt: None,
            temperature: None,
        };

        match ctx.sample(params).await {
            Ok(reply) => {
                debug!("Sampled reply from model {}", reply.model);
                let text = reply.text().unwrap_or("[non-text response]");
                Ok(success_result(format!("LLM Response: {}", text)))
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => Ok(error_result(format!("Sampling not supported or failed: {}", e))),
        }
    }
}
