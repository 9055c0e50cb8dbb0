//! Telemetry event types
//!
//! Every observable step of an orchestration run becomes one of these:
//! - Agent lifecycle (start, complete, error)
//! - Task progress through its phases
//! - Risks surfaced by the planner
//! - Task reallocations between agents

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// One immutable, timestamped telemetry record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl TelemetryEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Wire name of the event type
    pub fn event_type(&self) -> &'static str {
        match &self.kind {
            EventKind::AgentStart { .. } => "agent_start",
            EventKind::AgentComplete { .. } => "agent_complete",
            EventKind::AgentError { .. } => "agent_error",
            EventKind::TaskProgress { .. } => "task_progress",
            EventKind::RiskEvent { .. } => "risk_event",
            EventKind::Reallocation { .. } => "reallocation",
        }
    }

    /// Agent the event belongs to, if any
    pub fn agent_name(&self) -> Option<&str> {
        match &self.kind {
            EventKind::AgentStart { agent_name, .. }
            | EventKind::AgentComplete { agent_name, .. }
            | EventKind::AgentError { agent_name, .. }
            | EventKind::TaskProgress { agent_name, .. } => Some(agent_name),
            EventKind::RiskEvent { .. } | EventKind::Reallocation { .. } => None,
        }
    }
}

/// Type-specific payload of a [`TelemetryEvent`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EventKind {
    AgentStart {
        agent_name: String,
        task_id: String,
        task_name: String,
    },
    AgentComplete {
        agent_name: String,
        task_id: String,
        task_name: String,
        /// Milliseconds
        duration: u64,
    },
    AgentError {
        agent_name: String,
        task_id: String,
        task_name: String,
        error: String,
    },
    TaskProgress {
        task_id: String,
        task_name: String,
        phase: TaskPhase,
        /// 0 to 100
        progress: u8,
        agent_name: String,
    },
    RiskEvent {
        risk_id: String,
        risk_name: String,
        /// low, medium, high or critical
        severity: String,
        /// technical, timeline, resource or business
        category: String,
        status: RiskStatus,
    },
    Reallocation {
        task_id: String,
        task_name: String,
        from_agent: String,
        to_agent: String,
        reason: String,
    },
}

/// Phase reported by `task_progress`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPhase {
    Started,
    Processing,
    Completed,
    Failed,
}

/// Lifecycle of a tracked risk
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskStatus {
    #[default]
    Identified,
    Mitigated,
    Escalated,
}

/// Counters for one agent, created on its first event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    pub name: String,
    pub tasks_completed: u64,
    pub tasks_in_progress: u64,
    pub tasks_failed: u64,
    pub current_load: u64,
    /// Milliseconds
    pub average_task_time: f64,
    /// Milliseconds
    pub total_processing_time: u64,
}

impl AgentMetrics {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tasks_completed: 0,
            tasks_in_progress: 0,
            tasks_failed: 0,
            current_load: 0,
            average_task_time: 0.0,
            total_processing_time: 0,
        }
    }
}

/// Point-in-time view of the tracker
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub agent_metrics: Vec<AgentMetrics>,
    pub total_tasks_completed: u64,
    pub total_tasks_in_progress: u64,
    pub total_tasks_failed: u64,
    pub recent_events: Vec<TelemetryEvent>,
    pub task_timeline: Vec<TelemetryEvent>,
    pub risk_events: Vec<TelemetryEvent>,
    pub reallocation_events: Vec<TelemetryEvent>,
}

/// Per-agent load within one minute
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadBucket {
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub loads: BTreeMap<String, u64>,
}

pub const RISK_CATEGORIES: [&str; 4] = ["technical", "timeline", "resource", "business"];
pub const RISK_SEVERITIES: [&str; 4] = ["low", "medium", "high", "critical"];

/// Risk counts by category and severity
///
/// Serializes as `{ category: { severity: count } }` over the fixed grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RiskHeatmap {
    counts: [[u64; 4]; 4],
}

impl RiskHeatmap {
    /// Count one risk; combinations outside the grid are ignored
    pub fn record(&mut self, category: &str, severity: &str) -> bool {
        let cat = RISK_CATEGORIES.iter().position(|c| *c == category);
        let sev = RISK_SEVERITIES.iter().position(|s| *s == severity);
        match (cat, sev) {
            (Some(c), Some(s)) => {
                self.counts[c][s] += 1;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, category: &str, severity: &str) -> Option<u64> {
        let c = RISK_CATEGORIES.iter().position(|x| *x == category)?;
        let s = RISK_SEVERITIES.iter().position(|x| *x == severity)?;
        Some(self.counts[c][s])
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}

struct HeatmapRow<'a>(&'a [u64; 4]);

impl Serialize for HeatmapRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(RISK_SEVERITIES.len()))?;
        for (sev, count) in RISK_SEVERITIES.iter().zip(self.0.iter()) {
            map.serialize_entry(sev, count)?;
        }
        map.end()
    }
}

impl Serialize for RiskHeatmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(RISK_CATEGORIES.len()))?;
        for (cat, row) in RISK_CATEGORIES.iter().zip(self.counts.iter()) {
            map.serialize_entry(cat, &HeatmapRow(row))?;
        }
        map.end()
    }
}
