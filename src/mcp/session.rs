//! Per-connection session state.
//!
//! A [`Session`] is the handler's line back to the client: fire-and-forget
//! notifications, and server-to-client requests (sampling, elicitation)
//! correlated with the client's responses by request id.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mcp::elicitation::{ElicitOutcome, ElicitRequest, ELICIT_METHOD};
use crate::mcp::protocol::{
    ClientCapabilities, CreateMessageParams, CreateMessageResult, Implementation,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use crate::mcp::transport::Message;

/// Method name of server-to-client sampling requests.
pub const SAMPLING_METHOD: &str = "sampling/createMessage";

type PendingReply = oneshot::Sender<Result<Value>>;

/// One client connection.
pub struct Session {
    id: String,
    outgoing: mpsc::Sender<Message>,
    capabilities: RwLock<ClientCapabilities>,
    client_info: RwLock<Option<Implementation>>,
    /// Server-to-client requests awaiting a response.
    pending: DashMap<RequestId, PendingReply>,
    /// Client-to-server requests currently being handled.
    in_flight: DashMap<RequestId, CancellationToken>,
    next_id: AtomicI64,
    closed: CancellationToken,
    request_timeout: Option<Duration>,
}

impl Session {
    /// Create a session that writes to `outgoing`.
    pub fn new(outgoing: mpsc::Sender<Message>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            outgoing,
            capabilities: RwLock::new(ClientCapabilities::default()),
            client_info: RwLock::new(None),
            pending: DashMap::new(),
            in_flight: DashMap::new(),
            next_id: AtomicI64::new(1),
            closed: CancellationToken::new(),
            request_timeout: None,
        }
    }

    /// Bound every server-to-client request by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record what the client declared during `initialize`.
    pub fn set_client(&self, capabilities: ClientCapabilities, info: Option<Implementation>) {
        *self
            .capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner) = capabilities;
        *self
            .client_info
            .write()
            .unwrap_or_else(PoisonError::into_inner) = info;
    }

    pub fn client_info(&self) -> Option<Implementation> {
        self.client_info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_capabilities<T>(&self, f: impl FnOnce(&ClientCapabilities) -> T) -> T {
        f(&self.capabilities.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn supports_sampling(&self) -> bool {
        self.with_capabilities(|caps| caps.sampling.is_some())
    }

    pub fn supports_form_elicitation(&self) -> bool {
        self.with_capabilities(|caps| {
            caps.elicitation
                .as_ref()
                .map(|e| e.form.is_some() || e.url.is_none())
                .unwrap_or(false)
        })
    }

    pub fn supports_url_elicitation(&self) -> bool {
        self.with_capabilities(|caps| {
            caps.elicitation
                .as_ref()
                .map(|e| e.url.is_some())
                .unwrap_or(false)
        })
    }

    // ===== Outgoing messages =====

    /// Send a notification without waiting.
    ///
    /// Returns `false` if the notification could not be queued.
    pub fn notify(&self, notification: JsonRpcNotification) -> bool {
        match self.outgoing.try_send(Message::Notification(notification)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                warn!("Dropping notification, outgoing queue full: {:?}", msg);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Dropping notification, session {} closed", self.id);
                false
            }
        }
    }

    /// Queue a message, waiting for channel capacity.
    pub async fn send(&self, msg: Message) -> Result<()> {
        self.outgoing
            .send(msg)
            .await
            .map_err(|_| Error::SessionClosed)
    }

    /// Tell the client the tool list changed.
    pub fn notify_tools_changed(&self) -> bool {
        self.notify(JsonRpcNotification::new(
            "notifications/tools/list_changed",
            None,
        ))
    }

    /// Send a request to the client and wait for its response.
    ///
    /// The wait ends early when `cancel` fires, when the session closes, or
    /// when the configured request timeout elapses.
    pub async fn request(
        &self,
        method: &str,
        params: Value,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        if self.closed.is_cancelled() {
            return Err(Error::SessionClosed);
        }

        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(id.clone(), reply_tx);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            _ = self.closed.cancelled() => Err(Error::SessionClosed),
            result = self.send_and_wait(id.clone(), method, params, reply_rx) => result,
        };

        if self.pending.remove(&id).is_some() {
            debug!("Abandoned {} request {}: {:?}", method, id, outcome.as_ref().err());
            if matches!(outcome, Err(Error::Cancelled) | Err(Error::Timeout { .. })) {
                self.notify(JsonRpcNotification::new(
                    "notifications/cancelled",
                    Some(serde_json::json!({ "requestId": id, "reason": "request abandoned" })),
                ));
            }
        }
        outcome
    }

    async fn send_and_wait(
        &self,
        id: RequestId,
        method: &str,
        params: Value,
        reply_rx: oneshot::Receiver<Result<Value>>,
    ) -> Result<Value> {
        debug!("Sending {} request {} to client", method, id);
        self.send(Message::Request(JsonRpcRequest::new(id, method, Some(params))))
            .await?;

        let wait = async { reply_rx.await.map_err(|_| Error::SessionClosed)? };
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| Error::Timeout {
                    seconds: limit.as_secs(),
                })?,
            None => wait.await,
        }
    }

    /// Route a client response to the request waiting for it.
    ///
    /// Returns `false` if nothing was waiting for this id.
    pub fn handle_response(&self, response: JsonRpcResponse) -> bool {
        let Some((_, reply)) = self.pending.remove(&response.id) else {
            return false;
        };
        let result = match response.error {
            Some(err) => Err(Error::ClientRequest {
                code: err.code,
                message: err.message,
            }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };
        // The waiter may have been cancelled in the meantime.
        let _ = reply.send(result);
        true
    }

    // ===== Sub-protocols =====

    /// Ask the client's model for a completion.
    pub async fn sample(
        &self,
        params: CreateMessageParams,
        cancel: &CancellationToken,
    ) -> Result<CreateMessageResult> {
        if !self.supports_sampling() {
            return Err(Error::SamplingUnsupported);
        }
        let value = self
            .request(SAMPLING_METHOD, serde_json::to_value(params)?, cancel)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Ask the user for input.
    pub async fn elicit(
        &self,
        request: ElicitRequest,
        cancel: &CancellationToken,
    ) -> Result<ElicitOutcome> {
        let supported = match request {
            ElicitRequest::Form { .. } => self.supports_form_elicitation(),
            ElicitRequest::Url { .. } => self.supports_url_elicitation(),
        };
        if !supported {
            return Err(Error::ElicitationUnsupported {
                mode: request.mode(),
            });
        }
        let value = self
            .request(ELICIT_METHOD, serde_json::to_value(&request)?, cancel)
            .await?;
        ElicitOutcome::from_value(value)
    }

    // ===== In-flight requests =====

    /// Start tracking a client request; the token fires on cancel or close.
    pub fn begin_request(&self, id: RequestId) -> CancellationToken {
        let token = self.closed.child_token();
        self.in_flight.insert(id, token.clone());
        token
    }

    pub fn end_request(&self, id: &RequestId) {
        self.in_flight.remove(id);
    }

    /// Cancel an in-flight client request.
    pub fn cancel_request(&self, id: &RequestId) -> bool {
        match self.in_flight.remove(id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Close the session, releasing every suspended handler.
    pub fn close(&self) {
        self.closed.cancel();
        self.pending.clear();
        self.in_flight.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
