//! CLI command definitions and subcommands

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::affinity::{AffinityTask, AgentProfile, TeamMember};
use crate::classifier::Domain;
use crate::llm::{CostTier, TaskType};

/// PlanForge - Multi-Agent Project Planning
#[derive(Parser)]
#[command(
    name = "pf",
    about = "Turn a project description into a multi-agent plan",
    version = env!("CARGO_PKG_VERSION"),
    after_help = after_help()
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan a project with the planner and all executor agents
    Run {
        /// Project description
        input: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Also print the telemetry snapshot
        #[arg(short, long)]
        telemetry: bool,
    },

    /// Send one prompt through the primary/secondary fallback
    Ask {
        /// Prompt text
        prompt: String,
    },

    /// Run only the planner and print the roadmap as Markdown
    Plan {
        /// Project description
        input: String,
    },

    /// Show the domain a piece of text classifies as
    Classify {
        /// Text to classify
        text: String,

        /// Task name, classified together with the text
        #[arg(short, long, default_value = "")]
        task: String,
    },

    /// Show the provider order for a call
    Route {
        #[arg(long, value_enum, default_value_t = TaskType::Execution)]
        task_type: TaskType,

        #[arg(long, default_value = "general")]
        domain: Domain,

        #[arg(long, value_enum, default_value_t = CostTier::Standard)]
        cost_tier: CostTier,
    },

    /// Allocate tasks to agents from a JSON or YAML file
    Allocate {
        /// File with `tasks`, `agents` and optional `members`
        file: PathBuf,
    },
}

/// Output format for the run command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Input of the allocate command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationInput {
    pub tasks: Vec<AffinityTask>,
    pub agents: Vec<AgentProfile>,
    /// Team members to suggest as human owners
    pub members: Vec<TeamMember>,
}

impl AllocationInput {
    /// Read a `.json` file, or YAML for any other extension
    pub fn load(path: &Path) -> Result<Self> {
        debug!(?path, "AllocationInput::load: called");
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read allocation file {}", path.display()))?;
        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let input = if is_json {
            serde_json::from_str(&content).context("Failed to parse allocation JSON")?
        } else {
            serde_yaml::from_str(&content).context("Failed to parse allocation YAML")?
        };
        Ok(input)
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planforge")
        .join("logs")
        .join("planforge.log");
    debug!(?path, "get_log_path: returning path");
    path
}

fn after_help() -> String {
    format!(
        "Providers are configured in .planforge.yml or via GEMINI_API_KEY, LLAMA_ENDPOINT and LOCAL_MODEL_ENDPOINT.\n\nLogs are written to: {}",
        get_log_path().display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["pf", "run", "Build a chat app", "--format", "json", "--telemetry"]);
        match cli.command {
            Command::Run {
                input,
                format,
                telemetry,
            } => {
                assert_eq!(input, "Build a chat app");
                assert_eq!(format, OutputFormat::Json);
                assert!(telemetry);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::parse_from(["pf", "run", "x"]);
        assert!(matches!(
            cli.command,
            Command::Run {
                format: OutputFormat::Text,
                telemetry: false,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_parse_route() {
        let cli = Cli::parse_from([
            "pf",
            "route",
            "--task-type",
            "planning",
            "--domain",
            "Code",
            "--cost-tier",
            "cheap",
        ]);
        assert!(matches!(
            cli.command,
            Command::Route {
                task_type: TaskType::Planning,
                domain: Domain::Code,
                cost_tier: CostTier::Cheap,
            }
        ));
    }

    #[test]
    fn test_cli_parse_classify_with_task() {
        let cli = Cli::parse_from(["pf", "classify", "deploy it", "--task", "Risk Assessment"]);
        assert!(matches!(cli.command, Command::Classify { ref task, .. } if task == "Risk Assessment"));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from(["pf", "ask", "hello", "-l", "debug", "-c", "/tmp/pf.yml"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/pf.yml")));
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["pf"]).is_err());
    }

    #[test]
    fn test_allocation_input_yaml_and_json() {
        let temp = TempDir::new().unwrap();

        let yaml = temp.path().join("team.yml");
        std::fs::write(
            &yaml,
            r#"
tasks:
  - name: API
    requiredSkills: [backend]
agents:
  - name: Ada
    skills: [backend]
    experienceLevel: 3
"#,
        )
        .unwrap();
        let input = AllocationInput::load(&yaml).unwrap();
        assert_eq!(input.tasks[0].required_skills, vec!["backend"]);
        assert_eq!(input.agents[0].experience_level, Some(3));
        assert!(input.members.is_empty());

        let json = temp.path().join("team.json");
        std::fs::write(&json, r#"{"agents": [{"name": "Bo"}], "members": [{"name": "Cy"}]}"#).unwrap();
        let input = AllocationInput::load(&json).unwrap();
        assert!(input.tasks.is_empty());
        assert_eq!(input.members[0].capacity, 40.0);
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("planforge/logs/planforge.log"));
    }
}
