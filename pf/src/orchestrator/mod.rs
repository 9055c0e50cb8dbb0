//! Planner/executor orchestration
//!
//! The planner turns a project description into a roadmap, the four
//! specialist executors elaborate it concurrently, and the results are
//! compiled into a [`Report`].

mod agents;
mod engine;
mod explain;
mod issue;
mod report;
mod roadmap;

use serde::{Deserialize, Serialize};

pub use agents::{
    AgentOutput, ExecutorAgent, ExecutorError, ExecutorTask, Specialist, SpecialistAgent, TaskDescriptor,
    executor_tasks,
};
pub use engine::{INITIAL_MILESTONE, Orchestrator, OrchestratorError, ProjectState};
pub use explain::{DecisionType, Explanation, allocation_explanation, planner_explanation, roadmap_markdown};
pub use issue::{IssueOutcome, IssueReporter, IssueRequest, LogIssueReporter};
pub use report::{ARCHITECTURE, AgentOutputs, ExecutorEntry, Report, ReportMetadata, ReportSummary};
pub use roadmap::{
    Milestone, MilestoneTask, PlannerOutput, ProjectOverview, ResourceAllocation, Risk, RoleCount, Roadmap,
    parse_planner_output,
};

/// What an executor failure does to the rest of the batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// The run fails with the first executor error in dispatch order
    #[default]
    FailFast,
    /// Failed executors become error entries in the report
    Degrade,
}
