//! Tool invocation: lookup, argument validation, execution, packaging.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::error::{Error, Result};
use crate::mcp::context::ToolContext;
use crate::mcp::handler::{ToolRegistrar, ToolRegistry};
use crate::mcp::progress::ProgressToken;
use crate::mcp::protocol::{CallToolParams, RequestId, Tool, ToolResult};
use crate::mcp::session::Session;
use crate::metrics::{Metrics, Timer};

/// One `tools/call` as the dispatcher sees it.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub name: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
    pub progress_token: Option<ProgressToken>,
    pub request_id: Option<RequestId>,
    pub cancellation: CancellationToken,
}

impl Invocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: serde_json::Map::new(),
            progress_token: None,
            request_id: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Build an invocation from `tools/call` params.
    pub fn from_params(params: CallToolParams) -> Self {
        let progress_token = params.progress_token().cloned();
        Self {
            name: params.name,
            arguments: params.arguments,
            progress_token,
            request_id: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: serde_json::Map<String, serde_json::Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Routes invocations to tool handlers.
#[derive(Clone)]
pub struct Dispatcher {
    tools: Arc<ToolRegistry>,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(tools: Arc<ToolRegistry>, metrics: Arc<Metrics>) -> Self {
        Self { tools, metrics }
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Descriptors of every registered tool, in listing order.
    pub fn list(&self) -> Vec<Tool> {
        self.tools.list()
    }

    /// Run one invocation to completion.
    ///
    /// Unknown names and invalid arguments fail before any handler code
    /// runs. A handler that panics or returns an unexpected error yields
    /// [`Error::HandlerFault`]; the session and other invocations are
    /// unaffected.
    pub async fn invoke(&self, session: &Arc<Session>, invocation: Invocation) -> Result<ToolResult> {
        self.metrics.inc_tool_calls();
        let timer = Timer::start();
        let name = invocation.name;

        let Some(entry) = self.tools.lookup(&name) else {
            self.metrics.inc_unknown_capability();
            return Err(Error::UnknownCapability(name));
        };

        let arguments = match entry.descriptor.input_schema.validate(&invocation.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                self.metrics.inc_invalid_arguments();
                debug!("Rejected arguments for {}: {}", name, e);
                return Err(e);
            }
        };

        let mut ctx = ToolContext::new(
            Arc::clone(session),
            ToolRegistrar::new(Arc::clone(&self.tools), Arc::clone(&self.metrics)),
        )
        .with_progress_token(invocation.progress_token)
        .with_cancellation(invocation.cancellation);
        if let Some(id) = invocation.request_id {
            ctx = ctx.with_request_id(id);
        }

        let span = info_span!("tool", name = %name, session = %session.id());
        let outcome = AssertUnwindSafe(entry.handler.execute(&ctx, arguments))
            .catch_unwind()
            .instrument(span)
            .await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e @ Error::InvalidArgument(_))) => {
                self.metrics.inc_invalid_arguments();
                return Err(e);
            }
            Ok(Err(e @ Error::Cancelled)) => {
                debug!("Tool {} cancelled", name);
                return Err(e);
            }
            Ok(Err(e)) => {
                self.metrics.inc_handler_faults();
                error!("Tool {} failed: {}", name, e);
                return Err(Error::HandlerFault(format!("{}: {}", name, e)));
            }
            Err(panic) => {
                self.metrics.inc_handler_faults();
                let message = panic_message(&*panic);
                error!("Tool {} panicked: {}", name, message);
                return Err(Error::HandlerFault(format!("{} panicked: {}", name, message)));
            }
        };

        if let Some(progress) = ctx.progress() {
            progress.finish();
        }

        if result.is_error {
            self.metrics.inc_tool_errors();
        }

        if let (Some(schema), Some(structured)) =
            (&entry.descriptor.output_schema, &result.structured_content)
        {
            if let Err(e) = schema.conforms(structured) {
                warn!("Tool {} returned structured content outside its output schema: {}", name, e);
            }
        }

        debug!("Tool {} completed in {}ms", name, timer.elapsed_ms());
        Ok(result)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handler::{structured_result, success_result, Arguments, ToolHandler};
    use crate::mcp::schema::{FieldSchema, ObjectSchema};
    use crate::mcp::transport::Message;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    fn tool(name: &str, input_schema: ObjectSchema) -> Tool {
        Tool {
            name: name.to_string(),
            title: None,
            description: format!("Test tool: {}", name),
            input_schema,
            output_schema: None,
            annotations: None,
        }
    }

    /// Echoes its `name` argument and counts calls.
    struct Echo {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolHandler for Echo {
        fn definition(&self) -> Tool {
            tool(
                "echo",
                ObjectSchema::new()
                    .required_field("name", FieldSchema::string())
                    .field("style", FieldSchema::string().one_of(["plain", "loud"]).default_value("plain")),
            )
        }

        async fn execute(&self, _ctx: &ToolContext, args: Arguments) -> Result<ToolResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(success_result(format!(
                "{} {}",
                args["name"].as_str().unwrap_or_default(),
                args["style"].as_str().unwrap_or_default()
            )))
        }
    }

    struct Panics;

    #[async_trait]
    impl ToolHandler for Panics {
        fn definition(&self) -> Tool {
            tool("panics", ObjectSchema::new())
        }

        async fn execute(&self, _ctx: &ToolContext, _args: Arguments) -> Result<ToolResult> {
            panic!("boom");
        }
    }

    struct Fails;

    #[async_trait]
    impl ToolHandler for Fails {
        fn definition(&self) -> Tool {
            tool("fails", ObjectSchema::new())
        }

        async fn execute(&self, _ctx: &ToolContext, _args: Arguments) -> Result<ToolResult> {
            Err(Error::Internal("disk on fire".to_string()))
        }
    }

    struct Misshapen;

    #[async_trait]
    impl ToolHandler for Misshapen {
        fn definition(&self) -> Tool {
            let mut def = tool("misshapen", ObjectSchema::new());
            def.output_schema =
                Some(ObjectSchema::new().required_field("result", FieldSchema::number()));
            def
        }

        async fn execute(&self, _ctx: &ToolContext, _args: Arguments) -> Result<ToolResult> {
            Ok(structured_result("oops", json!({"result": "not a number"})))
        }
    }

    struct Progresses;

    #[async_trait]
    impl ToolHandler for Progresses {
        fn definition(&self) -> Tool {
            tool("progresses", ObjectSchema::new())
        }

        async fn execute(&self, ctx: &ToolContext, _args: Arguments) -> Result<ToolResult> {
            ctx.report_progress(0.5, Some("half"));
            Ok(success_result("done"))
        }
    }

    fn setup() -> (Dispatcher, Arc<Session>, mpsc::Receiver<Message>, Arc<AtomicUsize>, Arc<Metrics>) {
        let registry = Arc::new(ToolRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register_tool(Echo {
            calls: Arc::clone(&calls),
        });
        registry.register_tool(Panics);
        registry.register_tool(Fails);
        registry.register_tool(Misshapen);
        registry.register_tool(Progresses);

        let metrics = Metrics::new();
        let (tx, rx) = mpsc::channel(16);
        (
            Dispatcher::new(registry, Arc::clone(&metrics)),
            Arc::new(Session::new(tx)),
            rx,
            calls,
            metrics,
        )
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_unknown_capability() {
        let (dispatcher, session, _rx, _calls, metrics) = setup();
        let err = dispatcher
            .invoke(&session, Invocation::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCapability(name) if name == "nope"));
        assert_eq!(metrics.snapshot().unknown_capability, 1);
    }

    #[tokio::test]
    async fn test_missing_required_never_runs_handler() {
        let (dispatcher, session, _rx, calls, _metrics) = setup();
        let err = dispatcher
            .invoke(&session, Invocation::new("echo"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_enum_violation_rejected() {
        let (dispatcher, session, _rx, calls, _metrics) = setup();
        let invocation = Invocation::new("echo").with_arguments(args(json!({
            "name": "Ada",
            "style": "whisper"
        })));
        let err = dispatcher.invoke(&session, invocation).await.unwrap_err();
        assert!(err.to_string().contains("must be one of"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_defaults_applied_and_unknown_fields_ignored() {
        let (dispatcher, session, _rx, _calls, _metrics) = setup();
        let invocation = Invocation::new("echo").with_arguments(args(json!({
            "name": "Ada",
            "extra": true
        })));
        let result = dispatcher.invoke(&session, invocation).await.unwrap();
        assert_eq!(result.first_text(), Some("Ada plain"));
    }

    #[tokio::test]
    async fn test_panic_becomes_handler_fault() {
        let (dispatcher, session, _rx, _calls, metrics) = setup();
        let err = dispatcher
            .invoke(&session, Invocation::new("panics"))
            .await
            .unwrap_err();
        match err {
            Error::HandlerFault(msg) => assert!(msg.contains("boom")),
            other => panic!("Expected handler fault, got {}", other),
        }

        // The dispatcher keeps serving.
        let invocation = Invocation::new("echo").with_arguments(args(json!({"name": "Bo"})));
        assert!(dispatcher.invoke(&session, invocation).await.is_ok());
        assert_eq!(metrics.snapshot().handler_faults, 1);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_fault() {
        let (dispatcher, session, _rx, _calls, _metrics) = setup();
        let err = dispatcher
            .invoke(&session, Invocation::new("fails"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HandlerFault(msg) if msg.contains("disk on fire")));
    }

    #[tokio::test]
    async fn test_output_schema_mismatch_passes_through() {
        let (dispatcher, session, _rx, _calls, _metrics) = setup();
        let result = dispatcher
            .invoke(&session, Invocation::new("misshapen"))
            .await
            .unwrap();
        assert_eq!(result.structured_content, Some(json!({"result": "not a number"})));
    }

    #[tokio::test]
    async fn test_progress_closed_at_one() {
        let (dispatcher, session, mut rx, _calls, _metrics) = setup();
        let invocation = Invocation::from_params(
            serde_json::from_value(json!({
                "name": "progresses",
                "_meta": {"progressToken": "p1"}
            }))
            .unwrap(),
        );
        dispatcher.invoke(&session, invocation).await.unwrap();

        let mut values = Vec::new();
        while let Ok(Message::Notification(n)) = rx.try_recv() {
            values.push(n.params.unwrap()["progress"].as_f64().unwrap());
        }
        assert_eq!(values, vec![0.5, 1.0]);
    }

    #[test]
    fn test_list_returns_registered_tools() {
        let (dispatcher, _session, _rx, _calls, _metrics) = setup();
        let names: Vec<_> = dispatcher.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["echo", "panics", "fails", "misshapen", "progresses"]);
    }
}
