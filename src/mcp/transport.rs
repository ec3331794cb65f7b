//! MCP transport layer implementations.
//!
//! Supports stdio and in-process channel transports. The HTTP transport
//! lives in [`crate::http`].

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::mcp::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Buffer size of transport channels.
pub const CHANNEL_CAPACITY: usize = 100;

/// Longest stdin line accepted as one message.
const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// A message that can be sent or received.
#[derive(Debug, Clone)]
pub enum Message {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl Message {
    /// Parse one JSON-RPC message.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Ok(req) = serde_json::from_str::<JsonRpcRequest>(raw) {
            Ok(Message::Request(req))
        } else if let Ok(notif) = serde_json::from_str::<JsonRpcNotification>(raw) {
            Ok(Message::Notification(notif))
        } else if let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(raw) {
            Ok(Message::Response(resp))
        } else {
            Err(Error::McpProtocol(format!("Unparseable message: {}", raw)))
        }
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Message::Request(req) => serde_json::to_string(req),
            Message::Response(res) => serde_json::to_string(res),
            Message::Notification(notif) => serde_json::to_string(notif),
        }
    }
}

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start the transport, returning channels for messages.
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)>;

    /// Stop the transport.
    async fn stop(&mut self) -> Result<()>;
}

/// Stdio transport for MCP.
pub struct StdioTransport {
    running: bool,
}

impl StdioTransport {
    /// Create a new stdio transport.
    pub fn new() -> Self {
        Self { running: false }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)> {
        self.running = true;

        // Channel for incoming messages (from stdin)
        let (incoming_tx, incoming_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
        // Channel for outgoing messages (to stdout)
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut lines = FramedRead::new(
                tokio::io::stdin(),
                LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
            );

            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(LinesCodecError::MaxLineLengthExceeded) => {
                        error!("Dropping message longer than {} bytes", MAX_LINE_LENGTH);
                        continue;
                    }
                    Err(LinesCodecError::Io(e)) => {
                        error!("Error reading stdin: {}", e);
                        break;
                    }
                };

                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                trace!("Received: {}", trimmed);

                match Message::parse(trimmed) {
                    Ok(msg) => {
                        if incoming_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Failed to parse message: {}", e),
                }
            }
            debug!("EOF on stdin, stopping transport");
        });

        tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();

            while let Some(msg) = outgoing_rx.recv().await {
                match msg.to_json() {
                    Ok(s) => {
                        trace!("Sending: {}", s);
                        if let Err(e) = stdout.write_all(s.as_bytes()).await {
                            error!("Error writing to stdout: {}", e);
                            break;
                        }
                        if let Err(e) = stdout.write_all(b"\n").await {
                            error!("Error writing newline: {}", e);
                            break;
                        }
                        if let Err(e) = stdout.flush().await {
                            error!("Error flushing stdout: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error serializing message: {}", e);
                    }
                }
            }
        });

        Ok((incoming_rx, outgoing_tx))
    }

    async fn stop(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }
}

/// In-process transport backed by a pair of channels.
///
/// The server side is handed to [`crate::mcp::McpServer::run`]; the
/// [`MemoryClient`] side plays the client.
pub struct MemoryTransport {
    server_side: Option<(mpsc::Receiver<Message>, mpsc::Sender<Message>)>,
}

/// Client end of a [`MemoryTransport`].
pub struct MemoryClient {
    tx: mpsc::Sender<Message>,
    rx: mpsc::Receiver<Message>,
}

/// Create a connected transport/client pair.
pub fn memory_transport(buffer: usize) -> (MemoryTransport, MemoryClient) {
    let (client_tx, server_rx) = mpsc::channel(buffer);
    let (server_tx, client_rx) = mpsc::channel(buffer);
    (
        MemoryTransport {
            server_side: Some((server_rx, server_tx)),
        },
        MemoryClient {
            tx: client_tx,
            rx: client_rx,
        },
    )
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)> {
        self.server_side
            .take()
            .ok_or_else(|| Error::Internal("Memory transport already started".to_string()))
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

impl MemoryClient {
    /// Send a message to the server.
    pub async fn send(&self, msg: Message) -> Result<()> {
        self.tx.send(msg).await.map_err(|_| Error::SessionClosed)
    }

    /// Receive the next message from the server.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Close the client side, ending the server's read loop.
    pub fn close(self) -> mpsc::Receiver<Message> {
        self.rx
    }
}
