//! Planner roadmap types
//!
//! Models rarely follow a schema exactly. Every field is read leniently:
//! numbers stand in for strings, values of the wrong shape fall back to their
//! default, and anything unrecognised is kept in `extra`. Whether a planner
//! answer counts as parsed depends only on it being valid JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::llm::{ModelJson, RawOutput, extract_json};

/// Planner result: a roadmap, or the raw text when it did not parse
pub type PlannerOutput = ModelJson<Roadmap>;

/// Parse a planner answer; only invalid JSON gives `Unparsed`
pub fn parse_planner_output(text: &str) -> PlannerOutput {
    debug!(text_len = text.len(), "parse_planner_output: called");
    match extract_json::<Value>(text) {
        Ok(value) => ModelJson::Parsed(Roadmap::from_value(value)),
        Err(raw) => ModelJson::Unparsed(RawOutput::new(raw)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub project_overview: ProjectOverview,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub milestones: Vec<Milestone>,
    #[serde(default, deserialize_with = "lenient::allocation", skip_serializing_if = "Option::is_none")]
    pub resource_allocation: Option<ResourceAllocation>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub risks: Vec<Risk>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Roadmap {
    /// Read any JSON value; a non-object answer is kept under `extra["value"]`
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => match serde_json::from_value(Value::Object(map.clone())) {
                Ok(roadmap) => roadmap,
                Err(e) => {
                    warn!(error = %e, "Roadmap::from_value: keeping planner JSON untyped");
                    Self {
                        extra: map,
                        ..Self::default()
                    }
                }
            },
            other => {
                let mut extra = Map::new();
                extra.insert("value".to_string(), other);
                Self {
                    extra,
                    ..Self::default()
                }
            }
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.project_overview.description.as_deref()
    }

    pub fn task_count(&self) -> usize {
        self.milestones.iter().map(|m| m.tasks.len()).sum()
    }

    /// Skill names from `resourceAllocation.skillRequirements`, else the listed roles
    pub fn skill_categories(&self) -> Vec<&str> {
        let Some(allocation) = self.resource_allocation.as_ref() else {
            return Vec::new();
        };
        if allocation.skill_requirements.is_empty() {
            allocation.roles.iter().map(|r| r.role.as_str()).collect()
        } else {
            allocation.skill_requirements.keys().map(String::as_str).collect()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub objectives: Vec<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub success_criteria: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Ids of milestones this one waits for
    #[serde(default, deserialize_with = "lenient::strings")]
    pub dependencies: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub required_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub tasks: Vec<MilestoneTask>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneTask {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    /// Hours
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub effort: Option<f64>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt", skip_serializing_if = "Option::is_none")]
    pub can_parallel: Option<bool>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub dependencies: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAllocation {
    #[serde(default, deserialize_with = "lenient::strings")]
    pub team_composition: Vec<String>,
    /// Skill name to head count
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub skill_requirements: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub workload_distribution: Option<String>,
    /// Role list, when the planner answered with `[{"role", "count"}]`
    #[serde(default, deserialize_with = "lenient::seq", skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RoleCount>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCount {
    #[serde(default, deserialize_with = "lenient::string")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub count: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Field readers that never fail on a well-formed JSON value
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{ResourceAllocation, RoleCount};

    fn text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Leading number of `16`, `"16"` or `"16 hours"`
    fn leading_number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let s = s.trim();
                let end = s
                    .char_indices()
                    .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
                    .map_or(s.len(), |(i, _)| i);
                s[..end].parse().ok()
            }
            _ => None,
        }
    }

    pub fn or_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        Ok(serde_json::from_value(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(serde_json::from_value(Value::deserialize(d)?).ok())
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(text(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(text(Value::deserialize(d)?))
    }

    /// A list of scalars, or a single scalar as a one-element list
    pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.into_iter().filter_map(text).collect(),
            other => text(other).into_iter().collect(),
        })
    }

    /// Entries that do not fit `T` are skipped
    pub fn seq<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(leading_number(&Value::deserialize(d)?))
    }

    /// An allocation object, or a bare list of roles
    pub fn allocation<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ResourceAllocation>, D::Error> {
        Ok(match Value::deserialize(d)? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            Value::Array(items) => Some(ResourceAllocation {
                roles: items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value::<RoleCount>(item).ok())
                    .collect(),
                ..ResourceAllocation::default()
            }),
            _ => None,
        })
    }
}
