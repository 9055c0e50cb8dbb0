//! Telemetry for orchestration runs
//!
//! The [`TelemetryTracker`] keeps bounded in-memory history and fans each
//! [`TelemetryEvent`] out to listeners and broadcast subscribers.

mod tracker;
mod types;

pub use tracker::{DEFAULT_CHANNEL_CAPACITY, Listener, ListenerHandle, TelemetryTracker};
pub use types::{
    AgentMetrics, EventKind, LoadBucket, MetricsSnapshot, RISK_CATEGORIES, RISK_SEVERITIES, RiskHeatmap, RiskStatus,
    TaskPhase, TelemetryEvent,
};
