//! Keyword-based domain classification
//!
//! Maps free text to a coarse [`Domain`] used to bias model routing.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Coarse category of a piece of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Planning,
    Code,
    Devops,
    Risk,
    Docs,
    General,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::Planning,
        Domain::Code,
        Domain::Devops,
        Domain::Risk,
        Domain::Docs,
        Domain::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Planning => "planning",
            Domain::Code => "code",
            Domain::Devops => "devops",
            Domain::Risk => "risk",
            Domain::Docs => "docs",
            Domain::General => "general",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown domain '{}'", s))
    }
}

/// Ordered rules; the first rule with a matching keyword wins
const RULES: &[(Domain, &[&str])] = &[
    (Domain::Planning, &["plan", "roadmap", "strategy", "milestone"]),
    (
        Domain::Code,
        &["code", "api", "sdk", "typescript", "python", "implementation"],
    ),
    (
        Domain::Devops,
        &["deploy", "docker", "k8s", "kubernetes", "ci", "cd", "pipeline", "cloud run"],
    ),
    (Domain::Risk, &["risk", "issue", "mitigation", "security", "privacy"]),
    (Domain::Docs, &["document", "docs", "readme", "spec", "report"]),
];

/// Classify `task_name` and `user_input` together
///
/// Matching is plain substring containment on the lowercased text, so short
/// keywords such as `ci` also match inside longer words.
pub fn classify(user_input: &str, task_name: &str) -> Domain {
    let text = format!("{} {}", task_name, user_input).to_lowercase();
    let domain = RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(domain, _)| *domain)
        .unwrap_or(Domain::General);
    debug!(%task_name, %domain, "classify: called");
    domain
}
