//! Executor agents
//!
//! Four statically defined specialists each own one slice of the plan. An
//! agent renders its prompt, makes one model call and hands the raw text
//! back; parsing happens in the orchestrator.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::affinity::{AffinityTask, AgentProfile};
use crate::llm::{LlmError, ModelClient};
use crate::prompts::{ExecutorContext, PromptError, PromptLoader};

/// Why an executor produced no output
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Model(#[from] LlmError),
}

/// What an agent is asked to work on
#[derive(Debug, Clone, Serialize)]
pub struct TaskDescriptor {
    /// Human-readable task name
    pub name: String,
    /// Planner roadmap as JSON, or the raw planner text
    pub project: String,
    pub milestone: String,
}

/// Raw result of one executor call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub agent: String,
    pub task: String,
    /// Model text, unparsed
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

/// A model-backed specialist
#[async_trait]
pub trait ExecutorAgent: Send + Sync {
    fn profile(&self) -> &AgentProfile;

    /// Prompt for `task`
    fn prompt(&self, task: &TaskDescriptor) -> Result<String, PromptError>;

    fn name(&self) -> &str {
        &self.profile().name
    }

    async fn execute(&self, task: &TaskDescriptor, model: &dyn ModelClient) -> Result<AgentOutput, ExecutorError> {
        debug!(agent = self.name(), task = %task.name, model = model.model_name(), "ExecutorAgent::execute: called");
        let prompt = self.prompt(task)?;
        let result = model.generate_content(&prompt).await?;
        Ok(AgentOutput {
            agent: self.name().to_string(),
            task: task.name.clone(),
            result,
            timestamp: Utc::now(),
        })
    }
}

/// The four executor roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialist {
    TechStack,
    Timeline,
    Risk,
    Deliverables,
}

impl Specialist {
    /// Dispatch order
    pub const ALL: [Specialist; 4] = [
        Specialist::TechStack,
        Specialist::Timeline,
        Specialist::Risk,
        Specialist::Deliverables,
    ];

    /// Stable task id
    pub fn task_id(&self) -> &'static str {
        match self {
            Specialist::TechStack => "techstack",
            Specialist::Timeline => "timeline",
            Specialist::Risk => "risks",
            Specialist::Deliverables => "deliverables",
        }
    }

    pub fn task_name(&self) -> &'static str {
        match self {
            Specialist::TechStack => "Technology Stack Analysis",
            Specialist::Timeline => "Timeline & Scheduling",
            Specialist::Risk => "Risk Assessment",
            Specialist::Deliverables => "Deliverables Definition",
        }
    }

    pub fn required_skills(&self) -> &'static [&'static str] {
        match self {
            Specialist::TechStack => &["architecture", "devops"],
            Specialist::Timeline => &["planning", "scheduling"],
            Specialist::Risk => &["risk-analysis", "security"],
            Specialist::Deliverables => &["documentation", "qa"],
        }
    }

    /// Prompt template name
    pub fn template(&self) -> &'static str {
        self.task_id()
    }

    pub fn profile(&self) -> AgentProfile {
        match self {
            Specialist::TechStack => {
                AgentProfile::new("TechStack Specialist", &["architecture", "devops", "backend", "frontend"], 5)
            }
            Specialist::Timeline => {
                AgentProfile::new("Timeline Specialist", &["planning", "scheduling", "project-management"], 5)
            }
            Specialist::Risk => AgentProfile::new("Risk Specialist", &["risk-analysis", "security", "compliance"], 5),
            Specialist::Deliverables => {
                AgentProfile::new("Deliverables Specialist", &["documentation", "qa", "testing"], 4)
            }
        }
    }
}

/// One executor slot of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorTask {
    pub id: String,
    pub name: String,
    pub required_skills: Vec<String>,
    pub specialist: Specialist,
    /// Name of the bound agent
    pub agent: String,
}

impl ExecutorTask {
    pub fn new(specialist: Specialist) -> Self {
        Self {
            id: specialist.task_id().to_string(),
            name: specialist.task_name().to_string(),
            required_skills: specialist.required_skills().iter().map(|s| s.to_string()).collect(),
            specialist,
            agent: specialist.profile().name,
        }
    }

    /// View of this task for the affinity scorer
    pub fn as_affinity_task(&self) -> AffinityTask {
        AffinityTask {
            name: self.name.clone(),
            required_skills: self.required_skills.clone(),
            preferred_timezone: Some("UTC".to_string()),
        }
    }
}

/// The fixed task list of a run, one per specialist
pub fn executor_tasks() -> Vec<ExecutorTask> {
    debug!("executor_tasks: called");
    Specialist::ALL.into_iter().map(ExecutorTask::new).collect()
}

/// Executor agent rendering its role's template
pub struct SpecialistAgent {
    specialist: Specialist,
    profile: AgentProfile,
    prompts: Arc<PromptLoader>,
}

impl SpecialistAgent {
    pub fn new(specialist: Specialist, prompts: Arc<PromptLoader>) -> Self {
        Self {
            specialist,
            profile: specialist.profile(),
            prompts,
        }
    }
}

#[async_trait]
impl ExecutorAgent for SpecialistAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    fn prompt(&self, task: &TaskDescriptor) -> Result<String, PromptError> {
        let ctx = ExecutorContext {
            task_name: task.name.clone(),
            project: task.project.clone(),
            milestone: task.milestone.clone(),
        };
        self.prompts.render(self.specialist.template(), &ctx)
    }
}
