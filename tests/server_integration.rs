//! Server Integration Tests
//!
//! These tests drive the full server loop over the in-memory transport,
//! playing the client: initialize, list, call, and answering the server's
//! own sampling and elicitation requests.

use serde_json::{json, Value};
use std::time::Duration;
use tokio::task::JoinHandle;

use mcp_starter_rs::config::Config;
use mcp_starter_rs::error::Result;
use mcp_starter_rs::mcp::protocol::{
    error_codes, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use mcp_starter_rs::mcp::server::McpServer;
use mcp_starter_rs::mcp::transport::{memory_transport, MemoryClient, Message};

const WAIT: Duration = Duration::from_secs(5);

/// Test client connected to a running server.
struct TestClient {
    client: MemoryClient,
    server: JoinHandle<Result<()>>,
    next_id: i64,
    /// Notifications seen while waiting for responses.
    notifications: Vec<JsonRpcNotification>,
    /// Responses that arrived while waiting for a different id.
    stray: Vec<JsonRpcResponse>,
}

impl TestClient {
    fn start(config: Config) -> Self {
        let server = McpServer::bootstrap(&config);
        let (transport, client) = memory_transport(64);
        let server = tokio::spawn(async move { server.run(transport).await });
        Self {
            client,
            server,
            next_id: 0,
            notifications: Vec::new(),
            stray: Vec::new(),
        }
    }

    fn fast() -> Self {
        Self::start(Config {
            long_task_steps: 5,
            long_task_step_ms: 1,
            ..Config::default()
        })
    }

    async fn send_request(&mut self, method: &str, params: Value) -> RequestId {
        self.next_id += 1;
        let id = RequestId::Number(self.next_id);
        self.client
            .send(Message::Request(JsonRpcRequest::new(
                id.clone(),
                method,
                Some(params),
            )))
            .await
            .expect("server gone");
        id
    }

    async fn notify(&self, method: &str, params: Value) {
        self.client
            .send(Message::Notification(JsonRpcNotification::new(
                method,
                Some(params),
            )))
            .await
            .expect("server gone");
    }

    async fn next_message(&mut self) -> Message {
        tokio::time::timeout(WAIT, self.client.recv())
            .await
            .expect("timed out waiting for the server")
            .expect("server closed the connection")
    }

    async fn wait_response(&mut self, id: &RequestId) -> JsonRpcResponse {
        loop {
            match self.next_message().await {
                Message::Response(resp) if &resp.id == id => return resp,
                Message::Response(resp) => self.stray.push(resp),
                Message::Notification(n) => self.notifications.push(n),
                Message::Request(req) => panic!("Unexpected server request: {}", req.method),
            }
        }
    }

    async fn wait_server_request(&mut self) -> JsonRpcRequest {
        loop {
            match self.next_message().await {
                Message::Request(req) => return req,
                Message::Notification(n) => self.notifications.push(n),
                Message::Response(resp) => self.stray.push(resp),
            }
        }
    }

    async fn reply(&self, id: RequestId, result: Value) {
        self.client
            .send(Message::Response(JsonRpcResponse::success(id, result)))
            .await
            .expect("server gone");
    }

    async fn request(&mut self, method: &str, params: Value) -> JsonRpcResponse {
        let id = self.send_request(method, params).await;
        self.wait_response(&id).await
    }

    async fn initialize(&mut self, capabilities: Value) -> Value {
        let response = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": "2025-11-25",
                    "capabilities": capabilities,
                    "clientInfo": {"name": "test-client", "version": "1.0.0"}
                }),
            )
            .await;
        self.notify("notifications/initialized", json!({})).await;
        response.result.expect("initialize failed")
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> JsonRpcResponse {
        self.request("tools/call", json!({"name": name, "arguments": arguments}))
            .await
    }

    fn notifications(&self, method: &str) -> Vec<&JsonRpcNotification> {
        self.notifications
            .iter()
            .filter(|n| n.method == method)
            .collect()
    }
}

fn text(response: &JsonRpcResponse) -> &str {
    response.result.as_ref().expect("expected a result")["content"][0]["text"]
        .as_str()
        .expect("expected text content")
}

fn is_error(response: &JsonRpcResponse) -> bool {
    response.result.as_ref().expect("expected a result")["isError"] == true
}

fn full_client() -> Value {
    json!({"sampling": {}, "elicitation": {"form": {}, "url": {}}})
}

fn tool_names(list: &JsonRpcResponse) -> Vec<String> {
    list.result.as_ref().unwrap()["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Lifecycle and listing
// ============================================================================

#[tokio::test]
async fn test_initialize_and_list() {
    let mut client = TestClient::fast();
    let init = client.initialize(json!({})).await;

    assert_eq!(init["serverInfo"]["name"], "mcp-starter");
    assert_eq!(init["capabilities"]["tools"]["listChanged"], true);

    let first = client.request("tools/list", json!({})).await;
    let second = client.request("tools/list", json!({})).await;
    assert_eq!(tool_names(&first).len(), 8);
    assert_eq!(tool_names(&first), tool_names(&second));

    let resources = client.request("resources/list", json!({})).await;
    let uris: Vec<_> = resources.result.unwrap()["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uri"].as_str().unwrap().to_string())
        .collect();
    assert!(uris.contains(&"about://server".to_string()));

    let prompts = client.request("prompts/list", json!({})).await;
    assert_eq!(prompts.result.unwrap()["prompts"].as_array().unwrap().len(), 2);

    let pong = client.request("ping", json!({})).await;
    assert_eq!(pong.result, Some(json!({})));
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_hello() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    let response = client.call_tool("hello", json!({"name": "Ada"})).await;
    assert_eq!(text(&response), "Hello, Ada! Welcome to MCP.");
    assert!(!is_error(&response));
}

#[tokio::test]
async fn test_missing_required_field_is_invalid_argument() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    let response = client.call_tool("hello", json!({})).await;
    let error = response.error.expect("expected a protocol error");
    assert_eq!(error.code, error_codes::INVALID_PARAMS);
    assert!(error.message.contains("name"));
}

#[tokio::test]
async fn test_enum_outside_set_is_invalid_argument() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    let response = client
        .call_tool("choose_color", json!({"color": "purple"}))
        .await;
    assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
}

#[tokio::test]
async fn test_unknown_tool_and_method() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    let response = client.call_tool("nonexistent_tool", json!({})).await;
    assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);

    let response = client.request("tools/frobnicate", json!({})).await;
    assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_structured_weather() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    let response = client
        .call_tool("get_weather", json!({"location": "Lisbon"}))
        .await;
    let result = response.result.unwrap();
    assert_eq!(result["structuredContent"]["location"], "Lisbon");
    assert_eq!(result["structuredContent"]["unit"], "celsius");
}

// ============================================================================
// Dynamic registration
// ============================================================================

#[tokio::test]
async fn test_dynamic_calculator() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    let before = client
        .call_tool("bonus_calculator", json!({"a": 6, "b": 3, "operation": "divide"}))
        .await;
    assert_eq!(before.error.unwrap().code, error_codes::INVALID_PARAMS);

    let loaded = client.call_tool("load_bonus_tool", json!({})).await;
    assert!(text(&loaded).contains("has been loaded"));
    assert_eq!(client.notifications("notifications/tools/list_changed").len(), 1);

    let list = client.request("tools/list", json!({})).await;
    let names = tool_names(&list);
    assert_eq!(names.len(), 9);
    assert_eq!(names.last().map(String::as_str), Some("bonus_calculator"));

    let quotient = client
        .call_tool("bonus_calculator", json!({"a": 6, "b": 3, "operation": "divide"}))
        .await;
    assert!(!is_error(&quotient));
    assert_eq!(text(&quotient), "6 divide 3 = 2");
    assert_eq!(quotient.result.unwrap()["structuredContent"]["result"], 2.0);

    let by_zero = client
        .call_tool("bonus_calculator", json!({"a": 6, "b": 0, "operation": "divide"}))
        .await;
    assert!(by_zero.error.is_none(), "division by zero is not a fault");
    assert!(is_error(&by_zero));
    assert_eq!(text(&by_zero), "Error: division by zero");

    let again = client.call_tool("load_bonus_tool", json!({})).await;
    assert!(text(&again).contains("already loaded"));
    assert_eq!(client.notifications("notifications/tools/list_changed").len(), 1);
}

#[tokio::test]
async fn test_registration_while_another_call_is_suspended() {
    let mut client = TestClient::fast();
    client.initialize(full_client()).await;

    let pending = client
        .send_request(
            "tools/call",
            json!({"name": "confirm_action", "arguments": {"action": "deploy"}}),
        )
        .await;
    let elicit = client.wait_server_request().await;
    assert_eq!(elicit.method, "elicitation/create");

    // confirm_action is parked on the client; the registry stays usable.
    let loaded = client.call_tool("load_bonus_tool", json!({})).await;
    assert!(text(&loaded).contains("has been loaded"));

    let sum = client
        .call_tool("bonus_calculator", json!({"a": 2, "b": 3, "operation": "add"}))
        .await;
    assert_eq!(text(&sum), "2 add 3 = 5");

    let list = client.request("tools/list", json!({})).await;
    assert!(tool_names(&list).contains(&"bonus_calculator".to_string()));

    client
        .reply(
            elicit.id,
            json!({"action": "accept", "content": {"confirm": true, "reason": "ok"}}),
        )
        .await;
    let confirmed = client.wait_response(&pending).await;
    assert_eq!(text(&confirmed), "Action confirmed: deploy\nReason: ok");
}

// ============================================================================
// Progress
// ============================================================================

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_one() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    let response = client
        .request(
            "tools/call",
            json!({
                "name": "long_task",
                "arguments": {"taskName": "demo"},
                "_meta": {"progressToken": "task-1"}
            }),
        )
        .await;
    assert!(text(&response).contains("completed successfully after 5 steps"));

    let progress: Vec<f64> = client
        .notifications("notifications/progress")
        .iter()
        .map(|n| {
            let params = n.params.as_ref().unwrap();
            assert_eq!(params["progressToken"], "task-1");
            params["progress"].as_f64().unwrap()
        })
        .collect();

    assert_eq!(progress.len(), 6);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&1.0));
}

#[tokio::test]
async fn test_no_progress_without_token() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    client
        .call_tool("long_task", json!({"taskName": "quiet"}))
        .await;
    assert!(client.notifications("notifications/progress").is_empty());
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_notification_stops_long_task() {
    let mut client = TestClient::start(Config {
        long_task_steps: 100,
        long_task_step_ms: 200,
        ..Config::default()
    });
    client.initialize(json!({})).await;

    let task_id = client
        .send_request(
            "tools/call",
            json!({
                "name": "long_task",
                "arguments": {"taskName": "doomed"},
                "_meta": {"progressToken": "t"}
            }),
        )
        .await;

    // The first progress notification shows the handler is running.
    match client.next_message().await {
        Message::Notification(n) => assert_eq!(n.method, "notifications/progress"),
        other => panic!("Expected progress, got {:?}", other),
    }

    client
        .notify(
            "notifications/cancelled",
            json!({"requestId": task_id, "reason": "user aborted"}),
        )
        .await;

    let pong = client.request("ping", json!({})).await;
    assert!(pong.result.is_some());

    // A cancelled request gets no response.
    let late = tokio::time::timeout(Duration::from_millis(500), client.client.recv()).await;
    if let Ok(Some(Message::Response(resp))) = late {
        assert_ne!(resp.id, task_id, "cancelled request was answered");
    }
    assert!(client.stray.iter().all(|r| r.id != task_id));
}

#[tokio::test]
async fn test_connection_close_releases_suspended_handler() {
    let mut client = TestClient::fast();
    client.initialize(full_client()).await;

    client
        .send_request("tools/call", json!({"name": "ask_llm", "arguments": {"prompt": "hi"}}))
        .await;
    let sampling = client.wait_server_request().await;
    assert_eq!(sampling.method, "sampling/createMessage");

    // Never answer; hang up instead.
    let TestClient { client, server, .. } = client;
    drop(client.close());

    let finished = tokio::time::timeout(WAIT, server)
        .await
        .expect("server did not stop after the client left");
    assert!(finished.unwrap().is_ok());
}

// ============================================================================
// Sampling
// ============================================================================

#[tokio::test]
async fn test_sampling_round_trip() {
    let mut client = TestClient::fast();
    client.initialize(full_client()).await;

    let call_id = client
        .send_request(
            "tools/call",
            json!({"name": "ask_llm", "arguments": {"prompt": "What is 2+2?", "maxTokens": 20}}),
        )
        .await;

    let sampling = client.wait_server_request().await;
    assert_eq!(sampling.method, "sampling/createMessage");
    let params = sampling.params.clone().unwrap();
    assert_eq!(params["maxTokens"], 20);
    assert_eq!(params["messages"][0]["role"], "user");

    client
        .reply(
            sampling.id,
            json!({
                "role": "assistant",
                "content": {"type": "text", "text": "4"},
                "model": "test-model",
                "stopReason": "endTurn"
            }),
        )
        .await;

    let response = client.wait_response(&call_id).await;
    assert_eq!(text(&response), "LLM Response: 4");
}

#[tokio::test]
async fn test_sampling_unsupported_is_error_envelope() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    let response = client.call_tool("ask_llm", json!({"prompt": "hi"})).await;
    assert!(response.error.is_none());
    assert!(is_error(&response));
    assert!(text(&response).starts_with("Sampling not supported or failed"));
}

// ============================================================================
// Elicitation
// ============================================================================

async fn confirm_with(action: Value) -> String {
    let mut client = TestClient::fast();
    client.initialize(full_client()).await;

    let call_id = client
        .send_request(
            "tools/call",
            json!({"name": "confirm_action", "arguments": {"action": "deploy"}}),
        )
        .await;

    let elicit = client.wait_server_request().await;
    assert_eq!(elicit.method, "elicitation/create");
    assert_eq!(elicit.params.as_ref().unwrap()["mode"], "form");
    client.reply(elicit.id, action).await;

    let response = client.wait_response(&call_id).await;
    text(&response).to_string()
}

#[tokio::test]
async fn test_elicitation_outcomes_are_distinct() {
    let accepted = confirm_with(json!({"action": "accept", "content": {"confirm": true}})).await;
    let declined = confirm_with(json!({"action": "decline"})).await;
    let cancelled = confirm_with(json!({"action": "cancel"})).await;
    let unexpected = confirm_with(json!({"action": "maybe"})).await;

    assert_eq!(accepted, "Action confirmed: deploy\nReason: No reason provided");
    assert_eq!(declined, "User declined to respond for: deploy");
    assert_eq!(cancelled, "User cancelled elicitation for: deploy");
    assert_eq!(unexpected, "Unexpected elicitation response: maybe");
}

#[tokio::test]
async fn test_wrongly_typed_confirmation_is_declined() {
    let text = confirm_with(json!({"action": "accept", "content": {"confirm": "yes"}})).await;
    assert_eq!(text, "Action declined by user: deploy");
}

#[tokio::test]
async fn test_url_elicitation_needs_url_capability() {
    let mut client = TestClient::fast();
    // Form-only elicitation support.
    client
        .initialize(json!({"elicitation": {}}))
        .await;

    let response = client.call_tool("get_feedback", json!({})).await;
    assert!(is_error(&response));
    assert!(text(&response).starts_with("URL elicitation not supported or failed"));
}

// ============================================================================
// Resources, prompts, completions
// ============================================================================

#[tokio::test]
async fn test_resource_templates() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    let greeting = client
        .request("resources/read", json!({"uri": "greeting://Ada%20Lovelace"}))
        .await;
    let contents = &greeting.result.unwrap()["contents"][0];
    assert_eq!(
        contents["text"],
        "Hello, Ada Lovelace! This greeting was generated just for you."
    );

    let item = client
        .request("resources/read", json!({"uri": "item://2"}))
        .await;
    let body: Value =
        serde_json::from_str(item.result.unwrap()["contents"][0]["text"].as_str().unwrap())
            .unwrap();
    assert_eq!(body["name"], "Gadget");

    let missing = client
        .request("resources/read", json!({"uri": "item://99"}))
        .await;
    assert_eq!(missing.error.unwrap().code, error_codes::INVALID_PARAMS);

    let unknown = client
        .request("resources/read", json!({"uri": "nowhere://x"}))
        .await;
    assert_eq!(unknown.error.unwrap().code, error_codes::INVALID_PARAMS);
}

#[tokio::test]
async fn test_prompt_with_completion() {
    let mut client = TestClient::fast();
    client.initialize(json!({})).await;

    let completion = client
        .request(
            "completion/complete",
            json!({
                "ref": {"type": "ref/prompt", "name": "greet"},
                "argument": {"name": "style", "value": "c"}
            }),
        )
        .await;
    assert_eq!(
        completion.result.unwrap()["completion"]["values"],
        json!(["casual"])
    );

    let prompt = client
        .request(
            "prompts/get",
            json!({"name": "greet", "arguments": {"name": "Ada", "style": "enthusiastic"}}),
        )
        .await;
    let messages = &prompt.result.unwrap()["messages"];
    assert_eq!(messages[0]["role"], "user");
    assert!(messages[0]["content"]["text"].as_str().unwrap().contains("Ada"));
}
