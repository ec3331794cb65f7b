//! HTTP server for MCP over HTTP/SSE transport.
//!
//! Every `POST /mcp` gets its own short-lived session. There is no back
//! channel, so sampling and elicitation are never advertised and tools that
//! need them answer with an error result.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mcp::protocol::{error_codes, JsonRpcRequest};
use crate::mcp::server::McpServer;
use crate::mcp::transport::{Message, CHANNEL_CAPACITY};

const SSE_MESSAGE_EVENT: &str = "message";

/// Build the router; exposed for in-process tests.
pub fn router(server: McpServer) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Start the HTTP server; returns after Ctrl+C.
pub async fn start_server(config: &Config, server: McpServer) -> Result<()> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::HttpServer(format!("Failed to bind {}: {}", addr, e)))?;

    info!("MCP endpoint: http://{}/mcp", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, router(server))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down HTTP server...");
        })
        .await?;

    Ok(())
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "server": "mcp-starter",
        "version": crate::VERSION
    }))
}

/// Prometheus metrics endpoint.
async fn metrics(State(server): State<McpServer>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        server.metrics().to_prometheus(),
    )
}

/// MCP endpoint: one JSON-RPC message per POST.
async fn handle_mcp(State(server): State<McpServer>, headers: HeaderMap, body: String) -> Response {
    let message = match Message::parse(&body) {
        Ok(message) => message,
        Err(e) => {
            debug!("Rejected HTTP message: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": {"code": error_codes::PARSE_ERROR, "message": e.to_string()}
                })),
            )
                .into_response();
        }
    };

    let request = match message {
        Message::Request(request) => request,
        // Nothing is in flight across POSTs, so there is nothing to route to.
        Message::Notification(_) | Message::Response(_) => {
            return StatusCode::ACCEPTED.into_response();
        }
    };

    if accepts_event_stream(&headers) {
        stream_response(server, request)
    } else {
        let (tx, _rx) = mpsc::channel(CHANNEL_CAPACITY);
        let session = server.open_session(tx);
        let response = server.handle_request(&session, request).await;
        server.close_session(&session);
        Json(response).into_response()
    }
}

/// Stream notifications as SSE events, then the response, then end.
fn stream_response(server: McpServer, request: JsonRpcRequest) -> Response {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let session = server.open_session(tx.clone());
        let response = server.handle_request(&session, request).await;
        if tx.send(Message::Response(response)).await.is_err() {
            debug!("SSE client went away before the response");
        }
        server.close_session(&session);
    });

    let stream = ReceiverStream::new(rx).filter_map(|msg| {
        msg.to_json()
            .ok()
            .map(|data| Ok::<_, Infallible>(Event::default().event(SSE_MESSAGE_EVENT).data(data)))
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
}
