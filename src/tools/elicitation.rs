//! Elicitation tools: a confirmation form and a feedback link.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::debug;

use crate::error::{Error, Result};
use crate::mcp::context::ToolContext;
use crate::mcp::elicitation::ElicitOutcome;
use crate::mcp::handler::{
    error_result, get_optional_string_arg, get_string_arg, success_result, Arguments, ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolAnnotations, ToolResult};
use crate::mcp::schema::{FieldSchema, ObjectSchema};

/// Asks the user to confirm an action through a form.
pub struct ConfirmActionTool;

impl ConfirmActionTool {
    fn form() -> ObjectSchema {
        ObjectSchema::new()
            .required_field(
                "confirm",
                FieldSchema::boolean()
                    .title("Confirm")
                    .description("Confirm the action"),
            )
            .field(
                "reason",
                FieldSchema::string()
                    .title("Reason")
                    .description("Optional reason for your choice"),
            )
    }
}

#[async_trait]
impl ToolHandler for ConfirmActionTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "confirm_action".to_string(),
            title: Some("Confirm Action".to_string()),
            description: "Demonstrates elicitation - requests user confirmation before proceeding"
                .to_string(),
            input_schema: ObjectSchema::new().required_field(
                "action",
                FieldSchema::string().description("The action to confirm"),
            ),
            output_schema: None,
            annotations: Some(ToolAnnotations {
                title: Some("Confirm Action".to_string()),
                read_only_hint: Some(false),
                destructive_hint: Some(false),
                idempotent_hint: Some(false),
                open_world_hint: Some(false),
            }),
        }
    }

    async fn execute(&self, ctx: &ToolContext, args: Arguments) -> Result<ToolResult> {
        let action = get_string_arg(&args, "action")?;

        let outcome = ctx
            .elicit_form(format!("Please confirm: {}", action), Self::form())
            .await;

        match outcome {
            Ok(ElicitOutcome::Accepted(content)) if content.get_bool("confirm") == Some(true) => {
                let reason = content.str_or("reason", "No reason provided");
                Ok(success_result(format!(
                    "Action confirmed: {}\nReason: {}",
                    action, reason
                )))
            }
            Ok(ElicitOutcome::Accepted(_)) => {
                Ok(success_result(format!("Action declined by user: {}", action)))
            }
            Ok(ElicitOutcome::Declined) => Ok(success_result(format!(
                "User declined to respond for: {}",
                action
            ))),
            Ok(ElicitOutcome::Cancelled) => Ok(success_result(format!(
                "User cancelled elicitation for: {}",
                action
            ))),
            Err(Error::UnexpectedElicitationAction(raw)) => Ok(success_result(format!(
                "Unexpected elicitation response: {}",
                raw
            ))),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => Ok(error_result(format!(
                "Elicitation not supported or failed: {}",
                e
            ))),
        }
    }
}

/// Sends the user to a feedback form.
pub struct FeedbackTool {
    url: String,
}

impl FeedbackTool {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The form link, prefilled with `topic` as the issue title.
    pub fn link(&self, topic: Option<&str>) -> String {
        match topic.filter(|t| !t.is_empty()) {
            Some(topic) => {
                let separator = if self.url.contains('?') { '&' } else { '?' };
                format!(
                    "{}{}title={}",
                    self.url,
                    separator,
                    utf8_percent_encode(topic, NON_ALPHANUMERIC)
                )
            }
            None => self.url.clone(),
        }
    }
}

#[async_trait]
impl ToolHandler for FeedbackTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_feedback".to_string(),
            title: Some("Get Feedback".to_string()),
            description: "Request feedback from the user via URL elicitation".to_string(),
            input_schema: ObjectSchema::new().field(
                "topic",
                FieldSchema::string().description("Optional topic for the feedback form"),
            ),
            output_schema: None,
            annotations: Some(ToolAnnotations {
                title: Some("Get Feedback".to_string()),
                read_only_hint: Some(true),
                destructive_hint: Some(false),
                idempotent_hint: Some(true),
                open_world_hint: Some(true),
            }),
        }
    }

    async fn execute(&self, ctx: &ToolContext, args: Arguments) -> Result<ToolResult> {
        let topic = get_optional_string_arg(&args, "topic");
        let url = self.link(topic.as_deref());
        debug!("Requesting feedback at {}", url);

        let outcome = ctx
            .elicit_url(
                "Please provide feedback on MCP Starters by completing the form at the URL below:",
                url.clone(),
            )
            .await;

        match outcome {
            Ok(ElicitOutcome::Accepted(_)) => Ok(success_result(
                "Thank you for providing feedback! Your input helps improve MCP Starters.",
            )),
            Ok(ElicitOutcome::Declined) => Ok(success_result(format!(
                "No problem! Feel free to provide feedback anytime at: {}",
                url
            ))),
            Ok(ElicitOutcome::Cancelled) => Ok(success_result("Feedback request cancelled.")),
            Err(Error::UnexpectedElicitationAction(raw)) => Ok(success_result(format!(
                "Unexpected elicitation response: {}\nFeedback URL: {}",
                raw, url
            ))),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => Ok(error_result(format!(
                "URL elicitation not supported or failed: {}",
                e
            ))),
        }
    }
}
