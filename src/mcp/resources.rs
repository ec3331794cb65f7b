//! MCP Resources Support
//!
//! Static resources are addressed by exact URI; templated resources by a
//! URI template such as `item://{id}`. Both live in the same generic
//! [`Registry`] as tools, keyed by URI and by template respectively.

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mcp::registry::Registry;

/// A resource exposed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A family of resources addressed through a URI template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Resource contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>, // base64 encoded
}

impl ResourceContents {
    /// Text contents for `uri`.
    pub fn text(uri: impl Into<String>, mime_type: &str, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some(mime_type.to_string()),
            text: Some(text.into()),
            blob: None,
        }
    }
}

/// Result of resources/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Result of resources/templates/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourceTemplatesResult {
    pub resource_templates: Vec<ResourceTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Result of resources/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

/// Template parameters extracted from a URI.
pub type UriParams = HashMap<String, String>;

/// Reads one resource or one family of templated resources.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Read the resource at `uri`.
    ///
    /// `params` holds the decoded template variables and is empty for
    /// static resources.
    async fn read(&self, uri: &str, params: &UriParams) -> Result<ReadResourceResult>;

    /// Suggest values for a template variable.
    fn complete(&self, _argument: &str, _prefix: &str) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A URI template of literal text and `{name}` variables.
///
/// Each variable matches a non-empty run of characters up to the next
/// literal segment. Matched values are percent-decoded.
///
/// ```
/// use mcp_starter_rs::mcp::resources::UriTemplate;
///
/// let template = UriTemplate::parse("greeting://{name}");
/// let params = template.matches("greeting://Ada%20L").unwrap();
/// assert_eq!(params["name"], "Ada L");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UriTemplate {
    segments: Vec<Segment>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            segments.push(Segment::Variable(rest[open + 1..close].to_string()));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Self { segments }
    }

    /// Variable names in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match `uri` against this template.
    pub fn matches(&self, uri: &str) -> Option<UriParams> {
        let mut params = UriParams::new();
        let mut rest = uri;
        let mut segments = self.segments.iter().peekable();

        while let Some(segment) = segments.next() {
            match segment {
                Segment::Literal(text) => rest = rest.strip_prefix(text.as_str())?,
                Segment::Variable(name) => {
                    let end = match segments.peek() {
                        Some(Segment::Literal(next)) => rest.find(next.as_str())?,
                        _ => rest.len(),
                    };
                    let raw = &rest[..end];
                    if raw.is_empty() {
                        return None;
                    }
                    let value = percent_decode_str(raw).decode_utf8_lossy().into_owned();
                    params.insert(name.clone(), value);
                    rest = &rest[end..];
                }
            }
        }

        rest.is_empty().then_some(params)
    }
}

/// Resource registry and manager.
pub struct ResourceRegistry {
    resources: Registry<Resource, dyn ResourceHandler>,
    templates: Registry<ResourceTemplate, dyn ResourceHandler>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            resources: Registry::new(),
            templates: Registry::new(),
        }
    }

    /// A registry holding the built-in resources and templates.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_resource(
            Resource {
                uri: "about://server".to_string(),
                name: "About".to_string(),
                description: Some("Information about this MCP server".to_string()),
                mime_type: Some("text/plain".to_string()),
            },
            Arc::new(AboutResource),
        );
        registry.register_resource(
            Resource {
                uri: "doc://example".to_string(),
                name: "Example Document".to_string(),
                description: Some("An example document resource".to_string()),
                mime_type: Some("text/plain".to_string()),
            },
            Arc::new(ExampleDocument),
        );
        registry.register_template(
            ResourceTemplate {
                uri_template: "greeting://{name}".to_string(),
                name: "Personalized Greeting".to_string(),
                description: Some("A personalized greeting for a specific person".to_string()),
                mime_type: Some("text/plain".to_string()),
            },
            Arc::new(GreetingResource),
        );
        registry.register_template(
            ResourceTemplate {
                uri_template: "item://{id}".to_string(),
                name: "Item Data".to_string(),
                description: Some("Data for a specific item by ID".to_string()),
                mime_type: Some("application/json".to_string()),
            },
            Arc::new(ItemResource),
        );
        registry
    }

    /// Register a static resource. Last write wins.
    pub fn register_resource(&self, resource: Resource, handler: Arc<dyn ResourceHandler>) {
        self.resources.register(resource.uri.clone(), resource, handler);
    }

    /// Register a resource template. Last write wins.
    pub fn register_template(&self, template: ResourceTemplate, handler: Arc<dyn ResourceHandler>) {
        self.templates
            .register(template.uri_template.clone(), template, handler);
    }

    /// Lists the static resources.
    pub fn list(&self) -> ListResourcesResult {
        ListResourcesResult {
            resources: self.resources.list(),
            next_cursor: None,
        }
    }

    /// Lists the resource templates.
    pub fn list_templates(&self) -> ListResourceTemplatesResult {
        ListResourceTemplatesResult {
            resource_templates: self.templates.list(),
            next_cursor: None,
        }
    }

    /// Reads a resource by URI.
    ///
    /// An exact static match wins over templates; templates are tried in
    /// registration order.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownCapability`] when nothing matches `uri`, or whatever
    /// the matched handler returns.
    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult> {
        if let Some(entry) = self.resources.lookup(uri) {
            return entry.handler.read(uri, &UriParams::new()).await;
        }

        let matched = {
            let snapshot = self.templates.snapshot();
            let found = snapshot.entries().find_map(|entry| {
                UriTemplate::parse(&entry.descriptor.uri_template)
                    .matches(uri)
                    .map(|params| (Arc::clone(&entry.handler), params))
            });
            found
        };

        match matched {
            Some((handler, params)) => {
                debug!("Resource {} matched template with {:?}", uri, params);
                handler.read(uri, &params).await
            }
            None => Err(Error::UnknownCapability(format!("resource {}", uri))),
        }
    }

    /// Complete a template variable.
    ///
    /// Returns an empty list for unknown templates.
    pub fn complete(&self, uri_template: &str, argument: &str, prefix: &str) -> Vec<String> {
        self.templates
            .lookup(uri_template)
            .map(|entry| entry.handler.complete(argument, prefix))
            .unwrap_or_default()
    }
}

// ===== Built-in resources =====

struct AboutResource;

#[async_trait]
impl ResourceHandler for AboutResource {
    async fn read(&self, uri: &str, _params: &UriParams) -> Result<ReadResourceResult> {
        let text = format!(
            "MCP Rust Starter v{}\n\n\
             This is a feature-complete MCP server demonstrating:\n\
             - Tools with annotations and structured output\n\
             - Resources (static and dynamic)\n\
             - Resource templates\n\
             - Prompts with completions\n\
             - Sampling, progress updates, and dynamic tool loading\n\n\
             For more information, visit: https://modelcontextprotocol.io",
            crate::VERSION
        );
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(uri, "text/plain", text)],
        })
    }
}

struct ExampleDocument;

const EXAMPLE_DOCUMENT: &str = r#"# Example Document

This is an example markdown document served as an MCP resource.

## Features

- **Bold text** and *italic text*
- Lists and formatting
- Code blocks

```rust
let hello = "world";
```

## Links

- [MCP Documentation](https://modelcontextprotocol.io)
- [Rust](https://www.rust-lang.org)"#;

#[async_trait]
impl ResourceHandler for ExampleDocument {
    async fn read(&self, uri: &str, _params: &UriParams) -> Result<ReadResourceResult> {
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(uri, "text/plain", EXAMPLE_DOCUMENT)],
        })
    }
}

struct GreetingResource;

#[async_trait]
impl ResourceHandler for GreetingResource {
    async fn read(&self, uri: &str, params: &UriParams) -> Result<ReadResourceResult> {
        let name = params.get("name").map(String::as_str).unwrap_or_default();
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(
                uri,
                "text/plain",
                format!("Hello, {}! This greeting was generated just for you.", name),
            )],
        })
    }
}

/// One entry of the example item store.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

/// Example item store.
pub const ITEMS: [Item; 3] = [
    Item {
        id: "1",
        name: "Widget",
        description: "A useful widget",
    },
    Item {
        id: "2",
        name: "Gadget",
        description: "A fancy gadget",
    },
    Item {
        id: "3",
        name: "Gizmo",
        description: "A mysterious gizmo",
    },
];

struct ItemResource;

#[async_trait]
impl ResourceHandler for ItemResource {
    async fn read(&self, uri: &str, params: &UriParams) -> Result<ReadResourceResult> {
        let id = params.get("id").map(String::as_str).unwrap_or_default();
        let item = ITEMS
            .iter()
            .find(|item| item.id == id)
            .ok_or_else(|| Error::InvalidArgument(format!("item not found: {}", id)))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(
                uri,
                "application/json",
                serde_json::to_string_pretty(item)?,
            )],
        })
    }

    fn complete(&self, argument: &str, prefix: &str) -> Vec<String> {
        if argument != "id" {
            return Vec::new();
        }
        ITEMS
            .iter()
            .map(|item| item.id)
            .filter(|id| id.starts_with(prefix))
            .map(String::from)
            .collect()
    }
}
