//! Prometheus metrics for monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total JSON-RPC requests processed
    pub requests_total: AtomicU64,
    /// Requests answered with a JSON-RPC error
    pub requests_failed: AtomicU64,
    /// Tool invocations dispatched
    pub tool_calls: AtomicU64,
    /// Tool results with the error flag set
    pub tool_errors: AtomicU64,
    /// Calls naming a capability that does not exist
    pub unknown_capability: AtomicU64,
    /// Calls rejected by schema validation
    pub invalid_arguments: AtomicU64,
    /// Handlers that panicked or failed unexpectedly
    pub handler_faults: AtomicU64,
    /// Tools registered by other tools at runtime
    pub dynamic_registrations: AtomicU64,
    /// Connected sessions
    pub active_sessions: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_calls(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_errors(&self) {
        self.tool_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unknown_capability(&self) {
        self.unknown_capability.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_invalid_arguments(&self) {
        self.invalid_arguments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_handler_faults(&self) {
        self.handler_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dynamic_registrations(&self) {
        self.dynamic_registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_opened(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        // Saturate at zero.
        let _ = self
            .active_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Get all metrics as a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            tool_errors: self.tool_errors.load(Ordering::Relaxed),
            unknown_capability: self.unknown_capability.load(Ordering::Relaxed),
            invalid_arguments: self.invalid_arguments.load(Ordering::Relaxed),
            handler_faults: self.handler_faults.load(Ordering::Relaxed),
            dynamic_registrations: self.dynamic_registrations.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP mcp_starter_requests_total Total number of requests
# TYPE mcp_starter_requests_total counter
mcp_starter_requests_total {}

# HELP mcp_starter_requests_failed Requests answered with a JSON-RPC error
# TYPE mcp_starter_requests_failed counter
mcp_starter_requests_failed {}

# HELP mcp_starter_tool_calls Tool calls count
# TYPE mcp_starter_tool_calls counter
mcp_starter_tool_calls {}

# HELP mcp_starter_tool_errors Tool results flagged as errors
# TYPE mcp_starter_tool_errors counter
mcp_starter_tool_errors {}

# HELP mcp_starter_unknown_capability Calls to unknown capabilities
# TYPE mcp_starter_unknown_capability counter
mcp_starter_unknown_capability {}

# HELP mcp_starter_invalid_arguments Calls rejected by argument validation
# TYPE mcp_starter_invalid_arguments counter
mcp_starter_invalid_arguments {}

# HELP mcp_starter_handler_faults Handler faults
# TYPE mcp_starter_handler_faults counter
mcp_starter_handler_faults {}

# HELP mcp_starter_dynamic_registrations Tools registered at runtime
# TYPE mcp_starter_dynamic_registrations counter
mcp_starter_dynamic_registrations {}

# HELP mcp_starter_active_sessions Connected sessions
# TYPE mcp_starter_active_sessions gauge
mcp_starter_active_sessions {}
"#,
            s.requests_total,
            s.requests_failed,
            s.tool_calls,
            s.tool_errors,
            s.unknown_capability,
            s.invalid_arguments,
            s.handler_faults,
            s.dynamic_registrations,
            s.active_sessions
        )
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_failed: u64,
    pub tool_calls: u64,
    pub tool_errors: u64,
    pub unknown_capability: u64,
    pub invalid_arguments: u64,
    pub handler_faults: u64,
    pub dynamic_registrations: u64,
    pub active_sessions: u64,
}

/// Timer for measuring durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
