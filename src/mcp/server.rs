//! MCP server implementation.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mcp::dispatcher::{Dispatcher, Invocation};
use crate::mcp::handler::ToolRegistry;
use crate::mcp::prompts::{ListPromptsResult, PromptRegistry};
use crate::mcp::protocol::*;
use crate::mcp::resources::ResourceRegistry;
use crate::mcp::session::Session;
use crate::mcp::transport::{Message, Transport};
use crate::metrics::Metrics;
use crate::{INSTRUCTIONS, VERSION};

/// Most values returned by one `completion/complete`.
const MAX_COMPLETIONS: usize = 100;

/// MCP server.
///
/// Cloning is cheap; every clone shares the same registries and metrics.
#[derive(Clone)]
pub struct McpServer {
    dispatcher: Dispatcher,
    resources: Arc<ResourceRegistry>,
    prompts: Arc<PromptRegistry>,
    metrics: Arc<Metrics>,
    name: String,
    version: String,
    request_timeout: Option<Duration>,
}

impl McpServer {
    /// Create a server over `tools` with no resources or prompts.
    pub fn new(name: impl Into<String>, tools: Arc<ToolRegistry>, metrics: Arc<Metrics>) -> Self {
        Self {
            dispatcher: Dispatcher::new(tools, Arc::clone(&metrics)),
            resources: Arc::new(ResourceRegistry::new()),
            prompts: Arc::new(PromptRegistry::new()),
            metrics,
            name: name.into(),
            version: VERSION.to_string(),
            request_timeout: None,
        }
    }

    pub fn with_resources(mut self, resources: ResourceRegistry) -> Self {
        self.resources = Arc::new(resources);
        self
    }

    pub fn with_prompts(mut self, prompts: PromptRegistry) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    /// Bound every sampling and elicitation wait.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build the server with every built-in tool, resource and prompt.
    pub fn bootstrap(config: &Config) -> Self {
        let tools = Arc::new(ToolRegistry::new());
        crate::tools::register_all_tools(&tools, config);
        info!("Registered {} MCP tools", tools.len());

        Self::new("mcp-starter", tools, Metrics::new())
            .with_resources(ResourceRegistry::with_builtin())
            .with_prompts(PromptRegistry::with_builtin())
            .with_request_timeout(config.client_request_timeout())
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Open a session whose outbound messages go to `outgoing`.
    pub fn open_session(&self, outgoing: mpsc::Sender<Message>) -> Arc<Session> {
        self.metrics.session_opened();
        let session = Session::new(outgoing).with_request_timeout(self.request_timeout);
        debug!("Opened session {}", session.id());
        Arc::new(session)
    }

    /// Close a session opened with [`McpServer::open_session`].
    pub fn close_session(&self, session: &Session) {
        session.close();
        self.metrics.session_closed();
        debug!("Closed session {}", session.id());
    }

    /// Run the server with the given transport until the client goes away.
    pub async fn run<T: Transport>(&self, mut transport: T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.name, self.version);

        let (mut incoming, outgoing) = transport.start().await?;
        let session = self.open_session(outgoing);

        while let Some(msg) = incoming.recv().await {
            match msg {
                Message::Request(req) => {
                    // Tracked before spawning so an immediate cancel finds it.
                    let cancel = session.begin_request(req.id.clone());
                    let server = self.clone();
                    let session = Arc::clone(&session);
                    tokio::spawn(async move {
                        let response = server.respond(&session, req, cancel.clone()).await;
                        if cancel.is_cancelled() {
                            debug!("Suppressing response to cancelled request {}", response.id);
                            return;
                        }
                        if let Err(e) = session.send(Message::Response(response)).await {
                            debug!("Failed to send response: {}", e);
                        }
                    });
                }
                Message::Response(resp) => {
                    if !session.handle_response(resp) {
                        warn!("Received response to unknown request");
                    }
                }
                Message::Notification(notif) => {
                    self.handle_notification(&session, notif);
                }
            }
        }

        self.close_session(&session);
        transport.stop().await?;
        info!("MCP server stopped");
        Ok(())
    }

    /// Handle one JSON-RPC request on `session`.
    pub async fn handle_request(&self, session: &Arc<Session>, req: JsonRpcRequest) -> JsonRpcResponse {
        let cancel = session.begin_request(req.id.clone());
        self.respond(session, req, cancel).await
    }

    async fn respond(
        &self,
        session: &Arc<Session>,
        req: JsonRpcRequest,
        cancel: CancellationToken,
    ) -> JsonRpcResponse {
        debug!("Handling request: {} (id: {})", req.method, req.id);
        self.metrics.inc_requests();

        let id = req.id;
        let result = self.route(session, &id, &req.method, req.params, cancel).await;
        session.end_request(&id);

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                self.metrics.inc_failed();
                debug!("Request {} ({}) failed: {}", id, req.method, e);
                JsonRpcResponse::failure(id, e.jsonrpc_code(), e.to_string())
            }
        }
    }

    async fn route(
        &self,
        session: &Arc<Session>,
        id: &RequestId,
        method: &str,
        params: Option<Value>,
        cancel: CancellationToken,
    ) -> Result<Value> {
        match method {
            // Core
            "initialize" => self.handle_initialize(session, params),
            "ping" => Ok(json!({})),
            // Tools
            "tools/list" => Ok(serde_json::to_value(ListToolsResult {
                tools: self.dispatcher.list(),
                next_cursor: None,
            })?),
            "tools/call" => {
                let params: CallToolParams = parse_params(params)?;
                let invocation = Invocation::from_params(params)
                    .with_request_id(id.clone())
                    .with_cancellation(cancel);
                let result = self.dispatcher.invoke(session, invocation).await?;
                Ok(serde_json::to_value(result)?)
            }
            // Resources
            "resources/list" => Ok(serde_json::to_value(self.resources.list())?),
            "resources/templates/list" => {
                Ok(serde_json::to_value(self.resources.list_templates())?)
            }
            "resources/read" => {
                #[derive(Deserialize)]
                struct ReadParams {
                    uri: String,
                }
                let params: ReadParams = parse_params(params)?;
                Ok(serde_json::to_value(self.resources.read(&params.uri).await?)?)
            }
            // Prompts
            "prompts/list" => Ok(serde_json::to_value(ListPromptsResult {
                prompts: self.prompts.list(),
                next_cursor: None,
            })?),
            "prompts/get" => {
                #[derive(Deserialize)]
                struct GetPromptParams {
                    name: String,
                    #[serde(default)]
                    arguments: HashMap<String, String>,
                }
                let params: GetPromptParams = parse_params(params)?;
                Ok(serde_json::to_value(
                    self.prompts.get(&params.name, &params.arguments)?,
                )?)
            }
            // Completions
            "completion/complete" => self.handle_completion(params),
            _ => Err(Error::MethodNotFound(method.to_string())),
        }
    }

    fn handle_notification(&self, session: &Session, notif: JsonRpcNotification) {
        debug!("Handling notification: {}", notif.method);

        match notif.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                #[derive(Deserialize)]
                struct CancelledParams {
                    #[serde(rename = "requestId")]
                    request_id: RequestId,
                    #[serde(default)]
                    reason: Option<String>,
                }
                match notif.params.map(serde_json::from_value::<CancelledParams>) {
                    Some(Ok(cancel)) => {
                        if session.cancel_request(&cancel.request_id) {
                            info!(
                                "Cancelled request {}: {}",
                                cancel.request_id,
                                cancel.reason.as_deref().unwrap_or("no reason given")
                            );
                        } else {
                            debug!("Cancel for unknown request {}", cancel.request_id);
                        }
                    }
                    _ => warn!("Malformed cancellation notification"),
                }
            }
            _ => {
                debug!("Unknown notification: {}", notif.method);
            }
        }
    }

    fn handle_initialize(&self, session: &Session, params: Option<Value>) -> Result<Value> {
        let params: InitializeParams = match params {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| Error::InvalidArgument(e.to_string()))?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            info!("Client connected: {} v{}", client.name, client.version);
        }
        session.set_client(params.capabilities, params.client_info);
        debug!(
            "Client features: sampling={} form={} url={}",
            session.supports_sampling(),
            session.supports_form_elicitation(),
            session.supports_url_elicitation()
        );

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: true }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
                prompts: Some(PromptsCapability {
                    list_changed: false,
                }),
                completions: Some(Map::new()),
                logging: None,
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_completion(&self, params: Option<Value>) -> Result<Value> {
        #[derive(Deserialize)]
        struct CompletionParams {
            r#ref: CompletionRef,
            argument: CompletionArgument,
        }

        #[derive(Deserialize)]
        #[serde(tag = "type")]
        enum CompletionRef {
            #[serde(rename = "ref/prompt")]
            Prompt { name: String },
            #[serde(rename = "ref/resource")]
            Resource { uri: String },
        }

        #[derive(Deserialize)]
        struct CompletionArgument {
            name: String,
            #[serde(default)]
            value: String,
        }

        let params: CompletionParams = parse_params(params)?;
        let argument = &params.argument;

        let mut values = match &params.r#ref {
            CompletionRef::Prompt { name } => {
                self.prompts.complete(name, &argument.name, &argument.value)
            }
            CompletionRef::Resource { uri } => {
                self.resources.complete(uri, &argument.name, &argument.value)
            }
        };

        let total = values.len();
        values.truncate(MAX_COMPLETIONS);

        Ok(json!({
            "completion": {
                "values": values,
                "total": total,
                "hasMore": total > MAX_COMPLETIONS
            }
        }))
    }
}

/// Decode request params, treating a missing object as empty.
fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T> {
    serde_json::from_value(params.unwrap_or_else(|| json!({})))
        .map_err(|e| Error::InvalidArgument(e.to_string()))
}
