//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Roadmap decomposition prompt for the planner
pub const PLANNER: &str = include_str!("../../prompts/planner.pmt");

/// Technology stack executor prompt
pub const TECHSTACK: &str = include_str!("../../prompts/techstack.pmt");

/// Timeline executor prompt
pub const TIMELINE: &str = include_str!("../../prompts/timeline.pmt");

/// Risk assessment executor prompt
pub const RISKS: &str = include_str!("../../prompts/risks.pmt");

/// Deliverables executor prompt
pub const DELIVERABLES: &str = include_str!("../../prompts/deliverables.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "planner" => Some(PLANNER),
        "techstack" => Some(TECHSTACK),
        "timeline" => Some(TIMELINE),
        "risks" => Some(RISKS),
        "deliverables" => Some(DELIVERABLES),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
