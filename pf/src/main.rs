//! PlanForge - Multi-Agent Project Planning
//!
//! CLI entry point.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use planforge::affinity::{MemberTask, allocate_tasks, find_best_member_for_task};
use planforge::classifier::{Domain, classify};
use planforge::cli::{AllocationInput, Cli, Command, OutputFormat};
use planforge::config::Config;
use planforge::llm::{
    ARCHITECT_SYSTEM_PROMPT, ChatCompletionsClient, ConfigClientFactory, CostTier, ModelClient, ModelJson,
    ModelRouter, PromptRouter, TaskType,
};
use planforge::orchestrator::{
    LogIssueReporter, Orchestrator, Report, allocation_explanation, planner_explanation, roadmap_markdown,
};
use planforge::prompts::PromptLoader;
use planforge::telemetry::TelemetryTracker;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planforge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(log_dir.join("planforge.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            input,
            format,
            telemetry,
        } => cmd_run(&config, &input, format, telemetry).await,
        Command::Ask { prompt } => cmd_ask(&config, &prompt).await,
        Command::Plan { input } => cmd_plan(&config, &input).await,
        Command::Classify { text, task } => {
            cmd_classify(&text, &task);
            Ok(())
        }
        Command::Route {
            task_type,
            domain,
            cost_tier,
        } => {
            cmd_route(&config, task_type, domain, cost_tier);
            Ok(())
        }
        Command::Allocate { file } => cmd_allocate(&file),
    }
}

fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    debug!("build_orchestrator: called");
    config.validate()?;
    let router = Arc::new(ModelRouter::from_config(&config.providers));
    let telemetry = Arc::new(TelemetryTracker::new(config.telemetry.clone()));
    let root = std::env::current_dir().context("Failed to read current directory")?;
    Ok(Orchestrator::new(router, telemetry, config.orchestrator.clone())
        .with_issue_reporter(Arc::new(LogIssueReporter))
        .with_prompts(PromptLoader::new(root)))
}

/// Run the full planner/executor pipeline
async fn cmd_run(config: &Config, input: &str, format: OutputFormat, show_telemetry: bool) -> Result<()> {
    debug!(input_len = input.len(), ?format, show_telemetry, "cmd_run: called");
    let mut orchestrator = build_orchestrator(config)?;

    println!("{} Planning: {}", "→".cyan(), input);
    let report = orchestrator.execute(input).await.context("Orchestration failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    if show_telemetry {
        let snapshot = orchestrator.telemetry().metrics_snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

fn print_report(report: &Report) {
    match &report.summary.project_roadmap {
        ModelJson::Parsed(roadmap) => print!("{}", roadmap_markdown(roadmap)),
        ModelJson::Unparsed(raw) => {
            println!("{} Planner output was not valid JSON:", "!".yellow());
            println!("{}", raw.raw);
        }
    }

    println!();
    println!("{}", "Executors".bold());
    for entry in &report.agent_outputs.executors {
        match &entry.error {
            None if entry.output.is_parse_error() => {
                println!("  {} {} ({}): unparsed output", "!".yellow(), entry.task, entry.agent)
            }
            None => println!("  {} {} ({})", "✓".green(), entry.task, entry.agent),
            Some(error) => println!("  {} {} ({}): {}", "✗".red(), entry.task, entry.agent, error),
        }
    }

    println!();
    println!(
        "{} of {} executor tasks completed ({} agents, {} v{})",
        report.summary.tasks_completed,
        report.agent_outputs.executors.len(),
        report.summary.total_agents,
        report.metadata.architecture,
        report.metadata.version
    );
}

/// Single prompt through the code-heavy fallback
async fn cmd_ask(config: &Config, prompt: &str) -> Result<()> {
    debug!(prompt_len = prompt.len(), "cmd_ask: called");
    let factory = Arc::new(ConfigClientFactory::new(config.providers.clone()));
    let secondary: Option<Arc<dyn ModelClient>> = if config.providers.llama.is_enabled() {
        let client: Arc<dyn ModelClient> = Arc::new(
            ChatCompletionsClient::from_config("llama", &config.providers.llama)?
                .with_system_prompt(ARCHITECT_SYSTEM_PROMPT),
        );
        Some(client)
    } else {
        None
    };

    let routed = PromptRouter::new(factory, secondary)
        .route_prompt(prompt)
        .await
        .context("Prompt failed")?;
    println!("{} {}", "model:".dimmed(), routed.model.to_string().cyan());
    println!("{}", routed.output);
    Ok(())
}

/// Planner only, rendered as Markdown
async fn cmd_plan(config: &Config, input: &str) -> Result<()> {
    debug!(input_len = input.len(), "cmd_plan: called");
    let orchestrator = build_orchestrator(config)?;
    let roadmap = orchestrator.run_planner(input).await.context("Planning failed")?;

    match roadmap {
        ModelJson::Parsed(roadmap) => {
            print!("{}", roadmap_markdown(&roadmap));
            let explanation = planner_explanation(&roadmap);
            println!();
            println!(
                "{} {} (confidence {:.2})",
                "Decision:".bold(),
                explanation.decision,
                explanation.confidence_score
            );
            for step in &explanation.reasoning_steps {
                println!("  - {}", step);
            }
        }
        ModelJson::Unparsed(raw) => {
            println!("{} Planner output was not valid JSON:", "!".yellow());
            println!("{}", raw.raw);
        }
    }
    Ok(())
}

fn cmd_classify(text: &str, task: &str) {
    debug!(%text, %task, "cmd_classify: called");
    println!("{}", classify(text, task).to_string().cyan());
}

fn cmd_route(config: &Config, task_type: TaskType, domain: Domain, cost_tier: CostTier) {
    debug!(?task_type, %domain, ?cost_tier, "cmd_route: called");
    let router = ModelRouter::from_config(&config.providers);
    let order: Vec<String> = router
        .route(task_type, domain, cost_tier)
        .iter()
        .map(|p| p.to_string())
        .collect();
    println!("{}", order.join(" → "));
}

fn cmd_allocate(file: &Path) -> Result<()> {
    debug!(?file, "cmd_allocate: called");
    let input = AllocationInput::load(file)?;
    if input.agents.is_empty() {
        println!("{} No agents in {}", "!".yellow(), file.display());
    }

    for allocation in allocate_tasks(&input.tasks, &input.agents) {
        let explanation = allocation_explanation(&allocation);
        println!(
            "{} {} → {} ({:.0}/100, confidence {:.2})",
            "✓".green(),
            allocation.task.name.bold(),
            allocation.assigned_agent.name.cyan(),
            allocation.affinity_score,
            explanation.confidence_score
        );
        for step in &explanation.reasoning_steps {
            println!("    {}", step.dimmed());
        }
    }

    if !input.members.is_empty() {
        println!();
        println!("{}", "Suggested owners".bold());
        for task in &input.tasks {
            let member_task = MemberTask {
                required_role: None,
                required_skills: task.required_skills.clone(),
            };
            let best = find_best_member_for_task(&member_task, &input.members);
            match best.member {
                Some(member) => println!("  {} → {} ({:.0}/100)", task.name, member.name.cyan(), best.score),
                None => println!("  {} → {}", task.name, "no available member".yellow()),
            }
        }
    }
    Ok(())
}
