//! Invocation context handed to every tool handler.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::mcp::elicitation::{ElicitOutcome, ElicitRequest};
use crate::mcp::handler::{ToolHandler, ToolRegistrar};
use crate::mcp::progress::{ProgressReporter, ProgressToken};
use crate::mcp::protocol::{CreateMessageParams, CreateMessageResult, RequestId};
use crate::mcp::schema::ObjectSchema;
use crate::mcp::session::Session;

/// What a handler can reach while it runs.
///
/// Every suspension (sampling, elicitation) is bound to the context's
/// cancellation token, so a cancelled request or a closed connection
/// releases the handler instead of leaving it waiting.
#[derive(Clone)]
pub struct ToolContext {
    request_id: Option<RequestId>,
    session: Arc<Session>,
    progress: Option<ProgressReporter>,
    cancellation: CancellationToken,
    registrar: ToolRegistrar,
}

impl ToolContext {
    pub fn new(session: Arc<Session>, registrar: ToolRegistrar) -> Self {
        Self {
            request_id: None,
            session,
            progress: None,
            cancellation: CancellationToken::new(),
            registrar,
        }
    }

    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Attach the caller's progress token.
    pub fn with_progress_token(mut self, token: Option<ProgressToken>) -> Self {
        self.progress = token.map(|t| ProgressReporter::new(t, Arc::clone(&self.session)));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // ===== Progress =====

    /// The reporter, when the caller asked for progress.
    pub fn progress(&self) -> Option<&ProgressReporter> {
        self.progress.as_ref()
    }

    /// Report progress; a no-op without a progress token.
    pub fn report_progress(&self, progress: f64, message: Option<&str>) {
        if let Some(reporter) = &self.progress {
            reporter.report(progress, message);
        }
    }

    // ===== Cancellation =====

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the invocation is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    // ===== Client requests =====

    /// Ask the client's model for a completion.
    pub async fn sample(&self, params: CreateMessageParams) -> Result<CreateMessageResult> {
        self.session.sample(params, &self.cancellation).await
    }

    pub async fn elicit(&self, request: ElicitRequest) -> Result<ElicitOutcome> {
        self.session.elicit(request, &self.cancellation).await
    }

    /// Ask the user to fill in a form.
    pub async fn elicit_form(
        &self,
        message: impl Into<String>,
        schema: ObjectSchema,
    ) -> Result<ElicitOutcome> {
        self.elicit(ElicitRequest::form(message, schema)).await
    }

    /// Ask the user to visit a link.
    pub async fn elicit_url(
        &self,
        message: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<ElicitOutcome> {
        self.elicit(ElicitRequest::url(message, url)).await
    }

    // ===== Dynamic registration =====

    pub fn has_tool(&self, name: &str) -> bool {
        self.registrar.contains(name)
    }

    /// Add a tool to the server and tell this session its tool list changed.
    pub fn register_tool(&self, handler: Arc<dyn ToolHandler>) {
        self.registrar.register(handler);
        self.session.notify_tools_changed();
    }

    /// Like [`register_tool`](Self::register_tool), but leaves an existing
    /// tool of the same name alone. Only a new registration notifies.
    pub fn register_new_tool(&self, handler: Arc<dyn ToolHandler>) -> bool {
        let added = self.registrar.register_new(handler);
        if added {
            self.session.notify_tools_changed();
        }
        added
    }
}
