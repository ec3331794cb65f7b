//! MCP Prompt Templates
//!
//! Pre-defined prompts that guide AI assistants in common tasks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::protocol::Role;
use crate::mcp::registry::Registry;

/// A prompt argument definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl PromptArgument {
    pub fn new(name: &str, title: &str, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            title: Some(title.to_string()),
            description: description.to_string(),
            required,
        }
    }
}

/// A prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A prompt message (the actual content).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: PromptContent,
}

impl PromptMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: PromptContent::Text { text: text.into() },
        }
    }
}

/// Prompt content types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    Text {
        text: String,
    },
    Resource {
        uri: String,
        #[serde(rename = "mimeType")]
        mime_type: Option<String>,
    },
}

/// Result of prompts/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Result of prompts/get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Prompt arguments as sent by the client.
pub type PromptArguments = HashMap<String, String>;

/// Renders one prompt.
pub trait PromptHandler: Send + Sync {
    /// Render the prompt. Required arguments are already checked.
    fn render(&self, args: &PromptArguments) -> Result<GetPromptResult>;

    /// Suggest values for an argument.
    fn complete(&self, _argument: &str, _prefix: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Prompt registry.
pub struct PromptRegistry {
    prompts: Registry<Prompt, dyn PromptHandler>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            prompts: Registry::new(),
        }
    }

    /// Create a registry with the built-in prompts.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(
            Prompt {
                name: "greet".to_string(),
                title: Some("Greeting Prompt".to_string()),
                description: "Generate a greeting message".to_string(),
                arguments: vec![
                    PromptArgument::new("name", "Name", "Name of the person to greet", true),
                    PromptArgument::new(
                        "style",
                        "Style",
                        "Greeting style (formal/casual/enthusiastic)",
                        false,
                    ),
                ],
            },
            Arc::new(GreetPrompt),
        );
        registry.register(
            Prompt {
                name: "code_review".to_string(),
                title: Some("Code Review".to_string()),
                description: "Review code for potential improvements".to_string(),
                arguments: vec![PromptArgument::new(
                    "code",
                    "Code",
                    "The code to review",
                    true,
                )],
            },
            Arc::new(CodeReviewPrompt),
        );
        registry
    }

    /// Register a prompt. Last write wins.
    pub fn register(&self, prompt: Prompt, handler: Arc<dyn PromptHandler>) {
        self.prompts.register(prompt.name.clone(), prompt, handler);
    }

    /// List all prompts.
    pub fn list(&self) -> Vec<Prompt> {
        self.prompts.list()
    }

    /// Get a prompt with arguments substituted.
    pub fn get(&self, name: &str, args: &PromptArguments) -> Result<GetPromptResult> {
        let entry = self
            .prompts
            .lookup(name)
            .ok_or_else(|| Error::UnknownCapability(format!("prompt {}", name)))?;

        for arg in entry.descriptor.arguments.iter().filter(|a| a.required) {
            if args.get(&arg.name).map_or(true, |v| v.is_empty()) {
                return Err(Error::InvalidArgument(format!(
                    "missing required field '{}'",
                    arg.name
                )));
            }
        }

        let mut result = entry.handler.render(args)?;
        if result.description.is_none() {
            result.description = Some(entry.descriptor.description.clone());
        }
        Ok(result)
    }

    /// Complete a prompt argument; unknown prompts complete to nothing.
    pub fn complete(&self, name: &str, argument: &str, prefix: &str) -> Vec<String> {
        self.prompts
            .lookup(name)
            .map(|entry| entry.handler.complete(argument, prefix))
            .unwrap_or_default()
    }
}

const GREETING_STYLES: [&str; 3] = ["formal", "casual", "enthusiastic"];

struct GreetPrompt;

impl PromptHandler for GreetPrompt {
    fn render(&self, args: &PromptArguments) -> Result<GetPromptResult> {
        let name = args.get("name").map(String::as_str).unwrap_or_default();
        let style = args.get("style").map(String::as_str).unwrap_or("casual");

        let text = match style {
            "formal" => format!("Please compose a formal, professional greeting for {}.", name),
            "enthusiastic" => format!("Create an excited, enthusiastic greeting for {}!", name),
            _ => format!("Write a casual, friendly hello to {}.", name),
        };

        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage::user(text)],
        })
    }

    fn complete(&self, argument: &str, prefix: &str) -> Vec<String> {
        if argument != "style" {
            return Vec::new();
        }
        GREETING_STYLES
            .iter()
            .filter(|s| s.starts_with(prefix))
            .map(|s| s.to_string())
            .collect()
    }
}

struct CodeReviewPrompt;

impl PromptHandler for CodeReviewPrompt {
    fn render(&self, args: &PromptArguments) -> Result<GetPromptResult> {
        let code = args.get("code").map(String::as_str).unwrap_or_default();
        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage::user(format!(
                "Please review the following code:\n\n```\n{}\n```",
                code
            ))],
        })
    }
}
