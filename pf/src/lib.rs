//! PlanForge - Multi-Agent Project Planning
//!
//! PlanForge turns a free-text project description into a structured plan.
//! A planner agent drafts a phased roadmap, then four specialist executor
//! agents elaborate the technology stack, timeline, risks and deliverables in
//! parallel. Every model call goes through a router that picks a provider per
//! task and falls back when a provider cannot be constructed.
//!
//! # Modules
//!
//! - [`classifier`] - Keyword domain classification
//! - [`llm`] - Model clients, provider routing and JSON extraction
//! - [`affinity`] - Task-to-agent and task-to-member scoring
//! - [`telemetry`] - Agent, task and risk event tracking
//! - [`orchestrator`] - Planner/executor pipeline and reports
//! - [`prompts`] - Prompt templates
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod affinity;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod telemetry;

// Re-export commonly used types
pub use affinity::{AffinityTask, AgentProfile, Allocation, TeamMember, allocate_tasks, find_best_member_for_task};
pub use classifier::{Domain, classify};
pub use config::{Config, OrchestratorConfig, ProvidersConfig, TelemetryConfig};
pub use llm::{
    ChatCompletionsClient, ClientFactory, CostTier, GeminiClient, LlmError, ModelClient, ModelJson, ModelRouter,
    PromptRouter, Provider, RouterError, TaskType,
};
pub use orchestrator::{
    ExecutorEntry, FailurePolicy, IssueReporter, LogIssueReporter, Orchestrator, OrchestratorError, PlannerOutput,
    Report, Roadmap,
};
pub use prompts::PromptLoader;
pub use telemetry::{EventKind, MetricsSnapshot, TelemetryEvent, TelemetryTracker};
