//! Task to team-member fit

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Scorer;

const ROLE_POINTS: f64 = 40.0;
const SKILL_POINTS: f64 = 40.0;
const CAPACITY_POINTS: f64 = 20.0;

fn default_capacity() -> f64 {
    40.0
}

fn default_available() -> bool {
    true
}

/// A person on a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Skill name to proficiency; zero proficiency counts as not held
    #[serde(default)]
    pub skills: Option<HashMap<String, u32>>,
    /// Hours per week
    #[serde(default = "default_capacity")]
    pub capacity: f64,
    #[serde(default)]
    pub current_workload: f64,
    #[serde(default = "default_available")]
    pub availability: bool,
}

/// A task looking for an owner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTask {
    #[serde(default)]
    pub required_role: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

/// Role match, proportional skill overlap and spare capacity
///
/// Empty required skills contribute nothing, as does a non-positive capacity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamMemberFit;

impl Scorer for TeamMemberFit {
    type Task = MemberTask;
    type Candidate = TeamMember;

    fn score(&self, task: &MemberTask, member: &TeamMember) -> f64 {
        let role = match (&task.required_role, &member.role) {
            (Some(wanted), Some(held)) if wanted == held => ROLE_POINTS,
            _ => 0.0,
        };

        let skills = match &member.skills {
            Some(held) if !task.required_skills.is_empty() => {
                let matched = task
                    .required_skills
                    .iter()
                    .filter(|s| held.get(*s).is_some_and(|level| *level > 0))
                    .count();
                matched as f64 / task.required_skills.len() as f64 * SKILL_POINTS
            }
            _ => 0.0,
        };

        let capacity = if member.capacity > 0.0 {
            (CAPACITY_POINTS * (1.0 - member.current_workload / member.capacity)).max(0.0)
        } else {
            0.0
        };

        role + skills + capacity
    }
}

/// Winner of [`find_best_member_for_task`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestMember<'a> {
    pub member: Option<&'a TeamMember>,
    /// -1 when nobody was eligible
    pub score: f64,
}

/// Highest-scoring available member with skills; the first seen keeps ties
pub fn find_best_member_for_task<'a>(task: &MemberTask, members: &'a [TeamMember]) -> BestMember<'a> {
    debug!(members = members.len(), "find_best_member_for_task: called");
    let scorer = TeamMemberFit;
    let mut best = BestMember {
        member: None,
        score: -1.0,
    };

    for member in members {
        if !member.availability || member.skills.is_none() {
            debug!(name = %member.name, "find_best_member_for_task: skipping ineligible member");
            continue;
        }
        let score = scorer.score(task, member);
        if score > best.score {
            best = BestMember {
                member: Some(member),
                score,
            };
        }
    }

    best
}
