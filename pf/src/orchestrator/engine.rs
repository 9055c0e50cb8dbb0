//! Multi-agent orchestration
//!
//! One `execute` call runs the planner, derives the fixed executor task list,
//! runs every executor concurrently and compiles a [`Report`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::FailurePolicy;
use super::agents::{ExecutorAgent, ExecutorError, ExecutorTask, SpecialistAgent, TaskDescriptor, executor_tasks};
use super::issue::{IssueReporter, IssueRequest};
use super::report::{AgentOutputs, ExecutorEntry, Report, ReportMetadata, ReportSummary};
use super::roadmap::{PlannerOutput, Roadmap, parse_planner_output};
use crate::classifier::classify;
use crate::config::OrchestratorConfig;
use crate::llm::{CostTier, LlmError, ModelJson, ModelRouter, RouterError, TaskType, TimeoutClient};
use crate::prompts::{PromptError, PromptLoader};
use crate::telemetry::{RiskStatus, TaskPhase, TelemetryTracker};

/// Milestone label handed to every executor
pub const INITIAL_MILESTONE: &str = "Initial Planning";

/// Orchestration errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Planner call failed")]
    Planner(#[source] LlmError),

    #[error(transparent)]
    Routing(#[from] RouterError),

    #[error("Executor task '{task_id}' failed")]
    Executor {
        task_id: String,
        #[source]
        source: ExecutorError,
    },

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// What the last run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectState {
    pub roadmap: Option<PlannerOutput>,
    pub allocations: Vec<ExecutorTask>,
    pub executions: Vec<ExecutorEntry>,
}

/// Plans a project and fans the plan out to the executor agents
pub struct Orchestrator {
    router: Arc<ModelRouter>,
    telemetry: Arc<TelemetryTracker>,
    issue_reporter: Option<Arc<dyn IssueReporter>>,
    prompts: Arc<PromptLoader>,
    config: OrchestratorConfig,
    state: ProjectState,
}

impl Orchestrator {
    pub fn new(router: Arc<ModelRouter>, telemetry: Arc<TelemetryTracker>, config: OrchestratorConfig) -> Self {
        debug!(?config, "Orchestrator::new: called");
        Self {
            router,
            telemetry,
            issue_reporter: None,
            prompts: Arc::new(PromptLoader::embedded_only()),
            config,
            state: ProjectState::default(),
        }
    }

    /// File blocker issues for failed executors
    pub fn with_issue_reporter(mut self, reporter: Arc<dyn IssueReporter>) -> Self {
        self.issue_reporter = Some(reporter);
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLoader) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    /// State of the most recent run
    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn telemetry(&self) -> &Arc<TelemetryTracker> {
        &self.telemetry
    }

    fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.config.call_timeout_ms)
    }

    /// Run the whole pipeline for one project description
    ///
    /// Executors run concurrently and are all awaited before the failure
    /// policy is applied.
    pub async fn execute(&mut self, user_input: &str) -> Result<Report, OrchestratorError> {
        info!(input_len = user_input.len(), policy = ?self.config.failure_policy, "Starting multi-agent orchestration");
        let started = Instant::now();
        self.state = ProjectState::default();

        let roadmap = self.run_planner(user_input).await?;
        self.state.roadmap = Some(roadmap.clone());

        let allocations = self.allocate_to_executors();
        self.state.allocations = allocations.clone();

        let executions = match self.execute_in_parallel(&roadmap, &allocations).await {
            Ok(executions) => executions,
            Err(e) => {
                error!(error = %e, "Orchestration failed");
                return Err(e);
            }
        };
        self.state.executions = executions.clone();

        let report = self.compile_report(roadmap, executions);
        info!(
            tasks_completed = report.summary.tasks_completed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Orchestration complete"
        );
        Ok(report)
    }

    /// Run only the planner step
    pub async fn run_planner(&self, user_input: &str) -> Result<PlannerOutput, OrchestratorError> {
        info!("Planner: creating roadmap");
        let domain = classify(user_input, "planner");
        let routed = self
            .router
            .get_model_for_task(TaskType::Planning, domain, CostTier::Standard)?;
        let client = TimeoutClient::wrap(routed.client, self.call_timeout());

        let prompt = self.prompts.planner_prompt(user_input)?;
        let text = client
            .generate_content(&prompt)
            .await
            .map_err(OrchestratorError::Planner)?;

        let roadmap = parse_planner_output(&text);
        match &roadmap {
            ModelJson::Parsed(parsed) => {
                debug!(milestones = parsed.milestones.len(), risks = parsed.risks.len(), "run_planner: parsed roadmap");
                self.track_roadmap_risks(parsed);
            }
            ModelJson::Unparsed(_) => warn!(provider = %routed.provider, "Planner output was not valid JSON, keeping raw text"),
        }
        Ok(roadmap)
    }

    fn track_roadmap_risks(&self, roadmap: &Roadmap) {
        for risk in &roadmap.risks {
            let severity = risk
                .severity
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
                .unwrap_or_else(|| "medium".to_string());
            let category = risk.category.as_deref().filter(|s| !s.is_empty()).unwrap_or("technical");
            let id = risk
                .id
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("risk-{}", Utc::now().timestamp_millis()));
            let name = risk.name.as_deref().filter(|s| !s.is_empty()).unwrap_or("Unknown Risk");
            self.telemetry
                .track_risk(&id, name, &severity, category, RiskStatus::Identified);
        }
    }

    /// The four executor tasks, one per specialist
    pub fn allocate_to_executors(&self) -> Vec<ExecutorTask> {
        info!("Allocating tasks to executor agents");
        executor_tasks()
    }

    async fn execute_in_parallel(
        &self,
        roadmap: &PlannerOutput,
        allocations: &[ExecutorTask],
    ) -> Result<Vec<ExecutorEntry>, OrchestratorError> {
        info!(tasks = allocations.len(), "Executing tasks in parallel");
        let description = roadmap.parsed().and_then(Roadmap::description).unwrap_or("");
        let project = project_context(roadmap);

        let results = join_all(
            allocations
                .iter()
                .map(|task| self.run_executor(task, description, &project)),
        )
        .await;

        let mut entries = Vec::with_capacity(results.len());
        for (task, result) in allocations.iter().zip(results) {
            match (result, self.config.failure_policy) {
                (Ok(entry), _) => entries.push(entry),
                (Err(e), FailurePolicy::FailFast) => return Err(e),
                (Err(e), FailurePolicy::Degrade) => {
                    warn!(task_id = %task.id, error = %e, "Executor failed, continuing without it");
                    entries.push(ExecutorEntry::failed(&task.agent, &task.name, error_chain(&e)));
                }
            }
        }
        Ok(entries)
    }

    async fn run_executor(
        &self,
        task: &ExecutorTask,
        description: &str,
        project: &str,
    ) -> Result<ExecutorEntry, OrchestratorError> {
        let started = Instant::now();
        let task_id = format!("task-{}-{}", task.id, Utc::now().timestamp_millis());
        let domain = classify(description, &task.name);
        let routed = self
            .router
            .get_model_for_task(TaskType::Execution, domain, CostTier::Standard)?;
        let client = TimeoutClient::wrap(routed.client, self.call_timeout());
        let agent = SpecialistAgent::new(task.specialist, self.prompts.clone());
        let agent_name = agent.name().to_string();
        debug!(%task_id, %domain, provider = %routed.provider, "run_executor: called");

        self.telemetry.track_agent_start(&agent_name, &task_id, &task.name);
        self.telemetry
            .track_task_progress(&task_id, &task.name, TaskPhase::Started, 0, &agent_name);

        let descriptor = TaskDescriptor {
            name: task.name.clone(),
            project: project.to_string(),
            milestone: INITIAL_MILESTONE.to_string(),
        };

        match agent.execute(&descriptor, client.as_ref()).await {
            Ok(out) => {
                self.telemetry
                    .track_task_progress(&task_id, &task.name, TaskPhase::Processing, 50, &agent_name);
                let output: ModelJson<Value> = ModelJson::from_text(&out.result);
                if output.is_parse_error() {
                    warn!(agent = %agent_name, "Could not parse executor JSON, keeping raw text");
                }
                self.telemetry
                    .track_task_progress(&task_id, &task.name, TaskPhase::Completed, 100, &agent_name);
                self.telemetry.track_agent_complete(
                    &agent_name,
                    &task_id,
                    &task.name,
                    started.elapsed().as_millis() as u64,
                );
                Ok(ExecutorEntry {
                    agent: out.agent,
                    task: out.task,
                    output,
                    error: None,
                })
            }
            Err(e) => {
                error!(%task_id, error = %e, "Executor task failed");
                self.telemetry
                    .track_agent_error(&agent_name, &task_id, &task.name, &e.to_string());
                self.telemetry
                    .track_task_progress(&task_id, &task.name, TaskPhase::Failed, 0, &agent_name);
                self.report_blocker(task, &e).await;
                Err(OrchestratorError::Executor {
                    task_id: task.id.clone(),
                    source: e,
                })
            }
        }
    }

    async fn report_blocker(&self, task: &ExecutorTask, err: &ExecutorError) {
        let Some(reporter) = &self.issue_reporter else {
            debug!("report_blocker: no issue reporter configured");
            return;
        };

        let request = IssueRequest {
            title: format!("[Blocker] {} failed during orchestration", task.name),
            body: blocker_body(task, err),
            labels: vec!["ai-blocker".to_string(), "auto-filed".to_string()],
        };
        match reporter.create_issue(request).await {
            Ok(outcome) => debug!(?outcome, "report_blocker: issue filed"),
            Err(e) => warn!(task_id = %task.id, error = %e, "Failed to create blocker issue"),
        }
    }

    fn compile_report(&self, roadmap: PlannerOutput, executions: Vec<ExecutorEntry>) -> Report {
        debug!(executions = executions.len(), "compile_report: called");
        let tasks_completed = executions.iter().filter(|e| e.succeeded()).count();
        Report {
            summary: ReportSummary {
                project_roadmap: roadmap.clone(),
                total_agents: executor_tasks().len() + 1,
                tasks_completed,
                execution_time: Utc::now(),
            },
            agent_outputs: AgentOutputs {
                planner: roadmap,
                executors: executions,
            },
            metadata: ReportMetadata::now(),
        }
    }
}

/// Roadmap as pretty JSON for executor prompts; raw text when unparsed
fn project_context(roadmap: &PlannerOutput) -> String {
    match roadmap {
        ModelJson::Parsed(parsed) => serde_json::to_string_pretty(parsed).unwrap_or_default(),
        ModelJson::Unparsed(raw) => raw.raw.clone(),
    }
}

/// Error and its sources, outermost first
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

fn blocker_body(task: &ExecutorTask, err: &ExecutorError) -> String {
    [
        "## Summary".to_string(),
        format!("Task: {} ({})", task.id, task.name),
        String::new(),
        "## Error".to_string(),
        format!("Message: {}", err),
        String::new(),
        "## Context".to_string(),
        "- Orchestrator: Multi-agent planning".to_string(),
        "- Phase: Executor".to_string(),
        String::new(),
        "<details>".to_string(),
        "<summary>Error chain</summary>".to_string(),
        String::new(),
        error_chain(err),
        String::new(),
        "</details>".to_string(),
    ]
    .join("\n")
}
