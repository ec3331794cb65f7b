//! MCP Progress Notifications
//!
//! Support for emitting progress updates during long-running operations.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::mcp::protocol::JsonRpcNotification;
use crate::mcp::session::Session;

/// Method name of progress notifications.
pub const PROGRESS_METHOD: &str = "notifications/progress";

/// Progress token for tracking operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

/// Progress notification params.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    pub progress_token: ProgressToken,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressParams {
    /// Wrap these params in a JSON-RPC notification.
    pub fn into_notification(self) -> JsonRpcNotification {
        JsonRpcNotification::new(PROGRESS_METHOD, serde_json::to_value(self).ok())
    }
}

#[derive(Debug, Default)]
struct ProgressState {
    last: f64,
    emitted: usize,
    /// Last value the session accepted for delivery.
    delivered: Option<f64>,
}

/// Progress reporter bound to one invocation.
///
/// Progress is a fraction in `[0, 1]` against a total of `1.0`. Reported
/// values never decrease: a value below the last one sent is raised to it.
/// Delivery is fire-and-forget and a failed send never reaches the caller.
#[derive(Clone)]
pub struct ProgressReporter {
    token: ProgressToken,
    session: Arc<Session>,
    state: Arc<Mutex<ProgressState>>,
}

impl ProgressReporter {
    pub fn new(token: ProgressToken, session: Arc<Session>) -> Self {
        Self {
            token,
            session,
            state: Arc::new(Mutex::new(ProgressState::default())),
        }
    }

    pub fn token(&self) -> &ProgressToken {
        &self.token
    }

    /// Send a progress notification.
    pub fn report(&self, progress: f64, message: Option<&str>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let requested = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        if requested < state.last {
            debug!(
                "Progress regression {} < {} clamped for token {:?}",
                requested, state.last, self.token
            );
        }
        state.last = requested.max(state.last);
        state.emitted += 1;

        let params = ProgressParams {
            progress_token: self.token.clone(),
            progress: state.last,
            total: Some(1.0),
            message: message.map(String::from),
        };
        // Queued under the lock so concurrent reports stay in order.
        if self.session.notify(params.into_notification()) {
            state.delivered = Some(state.last);
        }
    }

    /// Report `step` of `steps` completed.
    pub fn report_step(&self, step: usize, steps: usize, message: Option<&str>) {
        let progress = if steps == 0 {
            1.0
        } else {
            step as f64 / steps as f64
        };
        self.report(progress, message);
    }

    /// Report completion.
    pub fn complete(&self, message: Option<&str>) {
        self.report(1.0, message);
    }

    /// Close the sequence at `1.0` if anything was sent and the client has
    /// not been handed `1.0` yet. A dropped completion is sent again.
    pub fn finish(&self) {
        let pending = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.emitted > 0 && state.delivered.map_or(true, |d| d < 1.0)
        };
        if pending {
            self.complete(None);
        }
    }

    /// Number of notifications sent so far.
    pub fn emitted(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .emitted
    }
}
