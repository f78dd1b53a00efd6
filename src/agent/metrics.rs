//! Metrics for agent loop invocations
//!
//! Recorded through the `metrics` facade; with no recorder installed every
//! call is a no-op.
//!
//! # Metrics
//!
//! - `toolloop_invocations_total`: Counter of finished invocations by outcome
//! - `toolloop_invocation_duration_seconds`: Histogram of invocation duration
//! - `toolloop_rounds`: Histogram of model-call rounds consumed
//! - `toolloop_tool_calls_total`: Counter of tool executions by tool and status
//! - `toolloop_dropped_tool_calls_total`: Counter of tool calls ignored because
//!   they were not first in their reply
//! - `toolloop_active_invocations`: Gauge of invocations in flight
//!
//! # Examples
//!
//! ```
//! use toolloop::agent::metrics::LoopMetrics;
//!
//! let metrics = LoopMetrics::new("3f2c9a4e");
//! metrics.record_tool_call("getLocation", "success");
//! metrics.record_outcome(2, "answer");
//! ```

use metrics::{counter, decrement_gauge, histogram, increment_counter, increment_gauge};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Metrics collection for a single loop invocation
///
/// Uses an `AtomicBool` so the tracker can be shared by reference across
/// await points in `Send` futures.
#[derive(Debug)]
pub struct LoopMetrics {
    invocation_id: String,
    start: Instant,
    recorded: AtomicBool,
}

impl LoopMetrics {
    /// Starts tracking an invocation and bumps the in-flight gauge
    pub fn new(invocation_id: impl Into<String>) -> Self {
        increment_gauge!("toolloop_active_invocations", 1.0);
        Self {
            invocation_id: invocation_id.into(),
            start: Instant::now(),
            recorded: AtomicBool::new(false),
        }
    }

    /// Records one tool execution
    ///
    /// # Arguments
    ///
    /// * `tool` - Tool name
    /// * `status` - "success", "error", "unknown", or "timeout"
    pub fn record_tool_call(&self, tool: &str, status: &str) {
        increment_counter!(
            "toolloop_tool_calls_total",
            "tool" => tool.to_string(),
            "status" => status.to_string()
        );
    }

    /// Records tool calls that were requested but not executed
    pub fn record_dropped_tool_calls(&self, count: usize) {
        counter!("toolloop_dropped_tool_calls_total", count as u64);
    }

    /// Records how the invocation ended
    ///
    /// Only the first call has an effect.
    ///
    /// # Arguments
    ///
    /// * `rounds` - Model-call rounds consumed
    /// * `outcome` - "answer", "exhausted", or an error kind
    pub fn record_outcome(&self, rounds: usize, outcome: &str) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }

        histogram!(
            "toolloop_invocation_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "outcome" => outcome.to_string()
        );
        histogram!("toolloop_rounds", rounds as f64);
        increment_counter!("toolloop_invocations_total", "outcome" => outcome.to_string());
        decrement_gauge!("toolloop_active_invocations", 1.0);
    }

    /// Returns the invocation id this tracker belongs to
    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    /// Returns elapsed time since the invocation started
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    fn is_recorded(&self) -> bool {
        self.recorded.load(Ordering::SeqCst)
    }
}

impl Drop for LoopMetrics {
    fn drop(&mut self) {
        if !self.is_recorded() {
            decrement_gauge!("toolloop_active_invocations", 1.0);
        }
    }
}

/// Installs the Prometheus exporter when built with the `prometheus` feature
///
/// Without the feature this is a no-op and metrics are discarded.
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        if let Err(e) = PrometheusBuilder::new().install() {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        }
    }
}
