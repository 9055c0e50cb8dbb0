//! Decision explanations and roadmap rendering

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::roadmap::Roadmap;
use crate::affinity::Allocation;

const PLANNER_BASE_CONFIDENCE: f64 = 0.75;
const PLANNER_CONFIDENCE_STEP: f64 = 0.05;

/// Why an agent made a decision, and how sure it is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub agent_name: String,
    pub decision_type: DecisionType,
    pub decision: String,
    pub explanation: String,
    /// 0 to 1
    pub confidence_score: f64,
    pub reasoning_steps: Vec<String>,
    pub key_factors: Vec<String>,
    pub alternatives: Vec<String>,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    RoadmapGeneration,
    TaskAllocation,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Explain a roadmap decomposition
///
/// Confidence starts at 0.75 and gains 0.05 each for at least three
/// milestones, five tasks and three skill categories.
pub fn planner_explanation(roadmap: &Roadmap) -> Explanation {
    let milestones = roadmap.milestones.len();
    let tasks = roadmap.task_count();
    let skills = roadmap.skill_categories();
    debug!(milestones, tasks, skills = skills.len(), "planner_explanation: called");

    let mut confidence = PLANNER_BASE_CONFIDENCE;
    if milestones >= 3 {
        confidence += PLANNER_CONFIDENCE_STEP;
    }
    if tasks >= 5 {
        confidence += PLANNER_CONFIDENCE_STEP;
    }
    if skills.len() >= 3 {
        confidence += PLANNER_CONFIDENCE_STEP;
    }

    Explanation {
        agent_name: "Planner".to_string(),
        decision_type: DecisionType::RoadmapGeneration,
        decision: format!("Decomposed project into {} milestones with {} tasks", milestones, tasks),
        explanation: "The planner broke the request into phases to contain complexity and risk.".to_string(),
        confidence_score: confidence.min(1.0),
        reasoning_steps: vec![
            "Parsed project objectives and success criteria".to_string(),
            format!("Decomposed into {} sequential milestones", milestones),
            format!("Created {} tasks with dependencies", tasks),
            format!("Identified skill requirements: {}", skills.join(", ")),
        ],
        key_factors: strings(&[
            "Project complexity and scope",
            "Task interdependencies",
            "Required skill diversity",
            "Timeline constraints",
        ]),
        alternatives: strings(&[
            "Single-phase waterfall approach",
            "Sprint-based iterative approach",
            "Feature-driven parallel streams",
        ]),
        evidence: vec![
            format!("{} milestones", milestones),
            format!("{} tasks", tasks),
            format!("{} skill categories", skills.len()),
        ],
    }
}

/// Explain an affinity allocation; confidence is the score out of 100
pub fn allocation_explanation(allocation: &Allocation) -> Explanation {
    let task = &allocation.task;
    let agent = &allocation.assigned_agent;
    let score = allocation.affinity_score;
    debug!(task = %task.name, agent = %agent.name, score, "allocation_explanation: called");

    let required = if task.required_skills.is_empty() {
        "general".to_string()
    } else {
        task.required_skills.join(", ")
    };
    let skill_fit = if task.skill_match(agent) { "MATCH" } else { "PARTIAL" };
    let timezone_fit = if task.timezone_match(agent) { "YES" } else { "NO" };

    Explanation {
        agent_name: "Planner".to_string(),
        decision_type: DecisionType::TaskAllocation,
        decision: format!("Assigned task \"{}\" to {}", task.name, agent.name),
        explanation: format!(
            "Allocated to {} on skill match, current workload and experience.",
            agent.name
        ),
        confidence_score: (score / 100.0).min(1.0),
        reasoning_steps: vec![
            format!("Analyzed task requirements: {}", required),
            format!("Evaluated {} skill fit: {}", agent.name, skill_fit),
            format!("Checked workload: {} tasks assigned", agent.current_workload),
            format!("Verified timezone alignment: {}", timezone_fit),
            format!("Affinity score: {}/100", score),
        ],
        key_factors: strings(&["Skill match", "Current workload", "Experience level", "Timezone compatibility"]),
        alternatives: vec![
            format!("Allocate to backup agent (lower affinity: {:.0}/100)", score * 0.8),
            "Split task across multiple agents".to_string(),
        ],
        evidence: vec![
            format!("Task requires: {}", required),
            format!("Agent skills: {}", agent.skills.join(", ")),
            format!("Affinity score: {}/100", score),
        ],
    }
}

/// Render a roadmap as Markdown
pub fn roadmap_markdown(roadmap: &Roadmap) -> String {
    debug!(milestones = roadmap.milestones.len(), "roadmap_markdown: called");
    let overview = &roadmap.project_overview;
    let mut out = String::new();

    let _ = writeln!(out, "# {}", overview.name.as_deref().unwrap_or("Project Roadmap"));
    if let Some(description) = &overview.description {
        let _ = writeln!(out, "\n{}", description);
    }
    if let Some(duration) = &overview.estimated_duration {
        let _ = writeln!(out, "\n**Estimated duration:** {}", duration);
    }
    if !overview.objectives.is_empty() {
        let _ = writeln!(out, "\n## Objectives\n");
        for objective in &overview.objectives {
            let _ = writeln!(out, "- {}", objective);
        }
    }
    if !overview.success_criteria.is_empty() {
        let _ = writeln!(out, "\n## Success Criteria\n");
        for criterion in &overview.success_criteria {
            let _ = writeln!(out, "- {}", criterion);
        }
    }

    if !roadmap.milestones.is_empty() {
        let _ = writeln!(out, "\n## Milestones");
        for milestone in &roadmap.milestones {
            let _ = write!(out, "\n### {}", milestone.name);
            if let Some(duration) = &milestone.duration {
                let _ = write!(out, " ({})", duration);
            }
            let _ = writeln!(out);
            if let Some(description) = &milestone.description {
                let _ = writeln!(out, "\n{}", description);
            }
            if let Some(priority) = &milestone.priority {
                let _ = writeln!(out, "\n**Priority:** {}", priority);
            }
            if !milestone.dependencies.is_empty() {
                let _ = writeln!(out, "\n**Depends on:** {}", milestone.dependencies.join(", "));
            }
            if !milestone.tasks.is_empty() {
                let _ = writeln!(out);
                for task in &milestone.tasks {
                    match task.effort {
                        Some(effort) => {
                            let _ = writeln!(out, "- {} ({}h)", task.name, effort);
                        }
                        None => {
                            let _ = writeln!(out, "- {}", task.name);
                        }
                    }
                }
            }
        }
    }

    if !roadmap.risks.is_empty() {
        let _ = writeln!(out, "\n## Risks\n");
        for risk in &roadmap.risks {
            let name = risk.name.as_deref().unwrap_or("Unknown Risk");
            match &risk.severity {
                Some(severity) => {
                    let _ = writeln!(out, "- **{}** ({})", name, severity);
                }
                None => {
                    let _ = writeln!(out, "- **{}**", name);
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::{AffinityTask, AgentProfile, allocate_tasks};
    use crate::orchestrator::roadmap::{Milestone, MilestoneTask, ResourceAllocation, Risk};
    use serde_json::json;

    fn roadmap(milestones: usize, tasks_each: usize, skills: usize) -> Roadmap {
        let mut r = Roadmap::default();
        r.project_overview.name = Some("Chat".to_string());
        r.milestones = (0..milestones)
            .map(|i| Milestone {
                id: format!("m{i}"),
                name: format!("Milestone {i}"),
                tasks: (0..tasks_each)
                    .map(|j| MilestoneTask {
                        id: format!("t{i}{j}"),
                        name: format!("Task {j}"),
                        effort: Some(8.0),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            })
            .collect();
        let mut alloc = ResourceAllocation::default();
        for s in 0..skills {
            alloc.skill_requirements.insert(format!("skill{s}"), json!(1));
        }
        r.resource_allocation = Some(alloc);
        r
    }

    #[test]
    fn test_planner_confidence_steps() {
        assert_eq!(planner_explanation(&roadmap(1, 1, 0)).confidence_score, 0.75);
        assert!((planner_explanation(&roadmap(3, 1, 0)).confidence_score - 0.80).abs() < 1e-9);
        assert!((planner_explanation(&roadmap(3, 2, 3)).confidence_score - 0.90).abs() < 1e-9);
    }

    #[test]
    fn test_allocation_confidence_is_normalised() {
        let task = AffinityTask {
            name: "Risk Assessment".to_string(),
            required_skills: vec!["security".to_string()],
            preferred_timezone: Some("UTC".to_string()),
        };
        let agent = AgentProfile::new("Risk Specialist", &["security"], 4);
        let allocations = allocate_tasks(&[task], &[agent]);
        let explanation = allocation_explanation(&allocations[0]);
        assert_eq!(explanation.decision_type, DecisionType::TaskAllocation);
        assert!((explanation.confidence_score - 0.97).abs() < 1e-9);
        assert!(explanation.reasoning_steps.iter().any(|s| s.ends_with("MATCH")));
    }

    #[test]
    fn test_markdown_sections() {
        let mut r = roadmap(2, 1, 0);
        r.risks.push(Risk {
            name: Some("Scaling".to_string()),
            severity: Some("High".to_string()),
            ..Default::default()
        });
        r.milestones[1].dependencies = vec!["m0".to_string()];
        let md = roadmap_markdown(&r);
        assert!(md.starts_with("# Chat\n"));
        assert!(md.contains("### Milestone 1"));
        assert!(md.contains("**Depends on:** m0"));
        assert!(md.contains("- Task 0 (8h)"));
        assert!(md.contains("- **Scaling** (High)"));
    }
}
