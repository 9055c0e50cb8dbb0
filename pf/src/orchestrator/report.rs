//! Final orchestration report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::roadmap::PlannerOutput;
use crate::llm::ModelJson;

/// Architecture label carried in report metadata
pub const ARCHITECTURE: &str = "Multi-Agent System";

/// Everything one `execute` run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub summary: ReportSummary,
    pub agent_outputs: AgentOutputs,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub project_roadmap: PlannerOutput,
    /// Executors plus the planner
    pub total_agents: usize,
    /// Executors that returned output
    pub tasks_completed: usize,
    pub execution_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutputs {
    pub planner: PlannerOutput,
    pub executors: Vec<ExecutorEntry>,
}

/// One executor's contribution
///
/// A failed slot, kept only under the degrade policy, has a `null` output
/// and an `error` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorEntry {
    pub agent: String,
    pub task: String,
    pub output: ModelJson<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutorEntry {
    pub fn failed(agent: &str, task: &str, error: String) -> Self {
        Self {
            agent: agent.to_string(),
            task: task.to_string(),
            output: ModelJson::Parsed(Value::Null),
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub architecture: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl ReportMetadata {
    pub fn now() -> Self {
        Self {
            architecture: ARCHITECTURE.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }
    }
}
