//! Task to executor-agent affinity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Scorer;

const SKILL_POINTS: f64 = 40.0;
const WORKLOAD_POINTS: f64 = 30.0;
const WORKLOAD_PENALTY: f64 = 3.0;
const TIMEZONE_POINTS: f64 = 15.0;
const EXPERIENCE_MULTIPLIER: f64 = 3.0;
const EXPERIENCE_CAP: f64 = 15.0;

/// Capacity profile of an agent
///
/// Workload is static metadata; allocation never updates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub current_workload: u32,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub experience_level: Option<u32>,
}

impl AgentProfile {
    pub fn new(name: &str, skills: &[&str], experience_level: u32) -> Self {
        Self {
            name: name.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            current_workload: 0,
            timezone: Some("UTC".to_string()),
            experience_level: Some(experience_level),
        }
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }
}

/// A task as seen by the agent scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityTask {
    pub name: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_timezone: Option<String>,
}

impl AffinityTask {
    /// Whether `agent` has at least one of the required skills
    pub fn skill_match(&self, agent: &AgentProfile) -> bool {
        self.required_skills.iter().any(|s| agent.has_skill(s))
    }

    /// Two absent timezones count as a match
    pub fn timezone_match(&self, agent: &AgentProfile) -> bool {
        self.preferred_timezone == agent.timezone
    }
}

/// Skill overlap, spare capacity, timezone and experience
///
/// | term | points |
/// |------|--------|
/// | any required skill held | 40 |
/// | `30 - workload * 3` | 0 to 30 |
/// | timezone match | 15 |
/// | `experience * 3`, a missing or zero experience counting as 1 | 3 to 15 |
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskAgentAffinity;

impl Scorer for TaskAgentAffinity {
    type Task = AffinityTask;
    type Candidate = AgentProfile;

    fn score(&self, task: &AffinityTask, agent: &AgentProfile) -> f64 {
        let skill = if task.skill_match(agent) { SKILL_POINTS } else { 0.0 };
        let workload = (WORKLOAD_POINTS - agent.current_workload as f64 * WORKLOAD_PENALTY).max(0.0);
        let timezone = if task.timezone_match(agent) { TIMEZONE_POINTS } else { 0.0 };
        let level = agent.experience_level.filter(|e| *e > 0).unwrap_or(1);
        let experience = (level as f64 * EXPERIENCE_MULTIPLIER).min(EXPERIENCE_CAP);
        skill + workload + timezone + experience
    }
}

/// One task assigned to its best-scoring agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub task: AffinityTask,
    pub assigned_agent: AgentProfile,
    pub affinity_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Assign every task to its highest-scoring agent
///
/// Ties go to the agent listed first. With no agents no allocation is made,
/// so the result can be shorter than `tasks`.
pub fn allocate_tasks(tasks: &[AffinityTask], agents: &[AgentProfile]) -> Vec<Allocation> {
    debug!(tasks = tasks.len(), agents = agents.len(), "allocate_tasks: called");
    let scorer = TaskAgentAffinity;
    let mut allocations = Vec::with_capacity(tasks.len());

    for task in tasks {
        let mut scored: Vec<(f64, &AgentProfile)> = agents.iter().map(|a| (scorer.score(task, a), a)).collect();
        // sort_by is stable, so equal scores keep input order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let Some((score, agent)) = scored.first() else {
            debug!(task = %task.name, "allocate_tasks: no agents, skipping");
            continue;
        };
        debug!(task = %task.name, agent = %agent.name, score, "allocate_tasks: assigned");
        allocations.push(Allocation {
            task: task.clone(),
            assigned_agent: (*agent).clone(),
            affinity_score: *score,
            timestamp: Utc::now(),
        });
    }

    allocations
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn task(skills: &[&str], tz: Option<&str>) -> AffinityTask {
        AffinityTask {
            name: "t".to_string(),
            required_skills: skills.iter().map(|s| s.to_string()).collect(),
            preferred_timezone: tz.map(String::from),
        }
    }

    fn agent(name: &str, skills: &[&str], workload: u32, tz: Option<&str>, exp: Option<u32>) -> AgentProfile {
        AgentProfile {
            name: name.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            current_workload: workload,
            timezone: tz.map(String::from),
            experience_level: exp,
        }
    }

    #[test]
    fn test_full_score() {
        let t = task(&["architecture"], Some("UTC"));
        let a = agent("a", &["architecture"], 0, Some("UTC"), Some(5));
        assert_eq!(TaskAgentAffinity.score(&t, &a), 100.0);
    }

    #[test]
    fn test_missing_timezones_match() {
        // No preferred timezone and no agent timezone still earns the bonus
        let t = task(&[], None);
        let a = agent("a", &[], 0, None, None);
        assert_eq!(TaskAgentAffinity.score(&t, &a), 30.0 + 15.0 + 3.0);
    }

    #[test]
    fn test_workload_floors_at_zero() {
        let t = task(&["x"], Some("UTC"));
        let a = agent("a", &["y"], 25, Some("PST"), Some(1));
        assert_eq!(TaskAgentAffinity.score(&t, &a), 3.0);
    }

    #[test]
    fn test_experience_is_capped() {
        let t = task(&[], Some("UTC"));
        let a = agent("a", &[], 10, Some("CET"), Some(9));
        assert_eq!(TaskAgentAffinity.score(&t, &a), 15.0);
    }

    #[test]
    fn test_zero_experience_counts_as_one() {
        let t = task(&[], Some("UTC"));
        let zero = agent("a", &[], 10, Some("CET"), Some(0));
        let one = agent("a", &[], 10, Some("CET"), Some(1));
        let missing = agent("a", &[], 10, Some("CET"), None);
        assert_eq!(TaskAgentAffinity.score(&t, &zero), 3.0);
        assert_eq!(TaskAgentAffinity.score(&t, &zero), TaskAgentAffinity.score(&t, &one));
        assert_eq!(TaskAgentAffinity.score(&t, &zero), TaskAgentAffinity.score(&t, &missing));
    }

    #[test]
    fn test_allocate_picks_best_and_keeps_ties_in_order() {
        let tasks = vec![task(&["qa"], Some("UTC")), task(&["nothing"], Some("UTC"))];
        let agents = vec![
            agent("first", &["docs"], 0, Some("UTC"), Some(3)),
            agent("second", &["qa"], 0, Some("UTC"), Some(3)),
            agent("third", &["docs"], 0, Some("UTC"), Some(3)),
        ];
        let allocations = allocate_tasks(&tasks, &agents);
        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].assigned_agent.name, "second");
        assert_eq!(allocations[0].affinity_score, 94.0);
        assert_eq!(allocations[1].assigned_agent.name, "first");
    }

    #[test]
    fn test_allocate_without_agents() {
        let allocations = allocate_tasks(&[task(&["qa"], None)], &[]);
        assert!(allocations.is_empty());
    }

    #[test]
    fn test_profile_deserializes_camel_case() {
        let a: AgentProfile = serde_json::from_str(
            r#"{"name":"x","skills":["qa"],"currentWorkload":2,"experienceLevel":4}"#,
        )
        .unwrap();
        assert_eq!(a.current_workload, 2);
        assert_eq!(a.experience_level, Some(4));
        assert_eq!(a.timezone, None);
    }

    proptest! {
        #[test]
        fn prop_non_decreasing_in_experience(exp in 0u32..20, workload in 0u32..20) {
            let t = task(&["a"], Some("UTC"));
            let lo = agent("a", &["a"], workload, Some("UTC"), Some(exp));
            let hi = agent("a", &["a"], workload, Some("UTC"), Some(exp + 1));
            prop_assert!(TaskAgentAffinity.score(&t, &hi) >= TaskAgentAffinity.score(&t, &lo));
        }

        #[test]
        fn prop_non_increasing_in_workload(exp in 0u32..20, workload in 0u32..20) {
            let t = task(&["a"], None);
            let lo = agent("a", &["b"], workload, None, Some(exp));
            let hi = agent("a", &["b"], workload + 1, None, Some(exp));
            prop_assert!(TaskAgentAffinity.score(&t, &hi) <= TaskAgentAffinity.score(&t, &lo));
        }

        #[test]
        fn prop_bounded(exp in 0u32..50, workload in 0u32..50) {
            let t = task(&["a"], Some("UTC"));
            let a = agent("a", &["a"], workload, Some("UTC"), Some(exp));
            let score = TaskAgentAffinity.score(&t, &a);
            prop_assert!((0.0..=100.0).contains(&score));
        }

        #[test]
        fn prop_one_allocation_per_task_with_max_score(n_agents in 1usize..6, workloads in proptest::collection::vec(0u32..12, 6)) {
            let agents: Vec<AgentProfile> = (0..n_agents)
                .map(|i| agent(&format!("a{i}"), &["qa"], workloads[i], Some("UTC"), Some(2)))
                .collect();
            let tasks = vec![task(&["qa"], Some("UTC"))];
            let allocations = allocate_tasks(&tasks, &agents);
            prop_assert_eq!(allocations.len(), 1);
            let best = agents.iter().map(|a| TaskAgentAffinity.score(&tasks[0], a)).fold(f64::MIN, f64::max);
            prop_assert_eq!(allocations[0].affinity_score, best);
        }
    }
}
