//! Affinity scoring between work items and the people or agents doing them
//!
//! Two independent heuristics live here:
//!
//! - [`TaskAgentAffinity`] ranks executor agents for a task (0 to 100)
//! - [`TeamMemberFit`] picks a human team member for a task (0 to 100)
//!
//! They share the [`Scorer`] trait but keep their own formulas.

mod agent;
mod team;

pub use agent::{AffinityTask, AgentProfile, Allocation, TaskAgentAffinity, allocate_tasks};
pub use team::{BestMember, MemberTask, TeamMember, TeamMemberFit, find_best_member_for_task};

/// Bounded numeric fit between a task and a candidate
pub trait Scorer {
    type Task;
    type Candidate;

    /// Higher is better; never negative
    fn score(&self, task: &Self::Task, candidate: &Self::Candidate) -> f64;
}
