//! Integration tests for PlanForge
//!
//! These tests drive the orchestrator end to end through its public API with
//! scripted model clients, and once over HTTP against a mock provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use planforge::config::{ChatProviderConfig, GeminiConfig, OrchestratorConfig, ProvidersConfig};
use planforge::llm::{ClientFactory, LlmError, ModelClient, ModelJson, ModelRouter, Provider};
use planforge::orchestrator::{
    FailurePolicy, IssueOutcome, IssueReporter, IssueRequest, Orchestrator, OrchestratorError, Report,
};
use planforge::telemetry::{EventKind, TaskPhase, TelemetryTracker};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHAT_ROADMAP: &str = r#"```json
{
  "projectOverview": {
    "name": "Realtime Chat",
    "description": "A realtime chat application with rooms and presence",
    "objectives": ["Ship an MVP"]
  },
  "milestones": [
    { "id": "m1", "name": "Foundations", "tasks": [ { "id": "t1", "name": "Auth", "effort": 16 } ] },
    { "id": "m2", "name": "Messaging", "dependencies": ["m1"], "tasks": [ { "id": "t2", "name": "Rooms" } ] }
  ],
  "risks": [
    { "id": "r1", "name": "Websocket scaling", "severity": "High", "category": "technical" }
  ]
}
```"#;

// =============================================================================
// Test doubles
// =============================================================================

/// Answers by prompt content: planner, failing marker, or executor JSON
struct ScriptedClient {
    planner: String,
    fail_marker: Option<&'static str>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(planner: &str, fail_marker: Option<&'static str>) -> Self {
        Self {
            planner: planner.to_string(),
            fail_marker,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn generate_content(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("project planner") {
            return Ok(self.planner.clone());
        }
        if let Some(marker) = self.fail_marker
            && prompt.contains(marker)
        {
            return Err(LlmError::ApiError {
                provider: "scripted".to_string(),
                status: 503,
                body: "model overloaded".to_string(),
            });
        }
        Ok(r#"{"status": "ok", "items": ["a", "b"]}"#.to_string())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Gemini is always available; everything else is not configured
struct GeminiOnly(Arc<ScriptedClient>);

impl ClientFactory for GeminiOnly {
    fn build(&self, provider: Provider) -> Result<Arc<dyn ModelClient>, LlmError> {
        match provider {
            Provider::Gemini => Ok(self.0.clone()),
            other => Err(LlmError::NotConfigured(other.to_string())),
        }
    }

    fn local_enabled(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct RecordingReporter {
    requests: Mutex<Vec<IssueRequest>>,
}

#[async_trait]
impl IssueReporter for RecordingReporter {
    async fn create_issue(&self, request: IssueRequest) -> eyre::Result<IssueOutcome> {
        self.requests.lock().unwrap().push(request);
        Ok(IssueOutcome {
            number: Some(7),
            url: None,
            dry_run: false,
        })
    }
}

fn orchestrator(
    client: ScriptedClient,
    config: OrchestratorConfig,
) -> (Orchestrator, Arc<ScriptedClient>, Arc<TelemetryTracker>, Arc<RecordingReporter>) {
    let client = Arc::new(client);
    let router = Arc::new(ModelRouter::new(Arc::new(GeminiOnly(client.clone()))));
    let telemetry = Arc::new(TelemetryTracker::default());
    let reporter = Arc::new(RecordingReporter::default());
    let orch = Orchestrator::new(router, telemetry.clone(), config).with_issue_reporter(reporter.clone());
    (orch, client, telemetry, reporter)
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[tokio::test]
async fn test_chat_app_end_to_end() {
    let (mut orch, client, telemetry, reporter) =
        orchestrator(ScriptedClient::new(CHAT_ROADMAP, None), OrchestratorConfig::default());

    let report = orch.execute("Build a realtime chat application").await.unwrap();

    assert_eq!(report.summary.tasks_completed, 4);
    assert_eq!(report.summary.total_agents, 5);
    assert_eq!(report.agent_outputs.executors.len(), 4);
    let roadmap = report.agent_outputs.planner.parsed().expect("planner output parsed");
    assert_eq!(roadmap.milestones.len(), 2);

    let agents: Vec<&str> = report.agent_outputs.executors.iter().map(|e| e.agent.as_str()).collect();
    assert_eq!(
        agents,
        vec!["TechStack Specialist", "Timeline Specialist", "Risk Specialist", "Deliverables Specialist"]
    );
    for entry in &report.agent_outputs.executors {
        assert_eq!(entry.output, ModelJson::Parsed(json!({ "status": "ok", "items": ["a", "b"] })));
    }

    // One planner call plus four executors, each executor seeing the roadmap
    let prompts = client.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 5);
    assert!(prompts[1..].iter().all(|p| p.contains("Websocket scaling")));

    let snapshot = telemetry.metrics_snapshot();
    assert_eq!(snapshot.total_tasks_completed, 4);
    assert_eq!(snapshot.agent_metrics.len(), 4);
    assert_eq!(snapshot.risk_events.len(), 1);
    assert_eq!(telemetry.risk_heatmap().get("technical", "high"), Some(1));
    assert!(reporter.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_task_progress_order_per_executor() {
    let (mut orch, _, telemetry, _) =
        orchestrator(ScriptedClient::new(CHAT_ROADMAP, None), OrchestratorConfig::default());
    orch.execute("Build a realtime chat application").await.unwrap();

    let timeline = telemetry.metrics_snapshot().task_timeline;
    assert_eq!(timeline.len(), 12);
    for task_name in ["Technology Stack Analysis", "Risk Assessment"] {
        let phases: Vec<(TaskPhase, u8)> = timeline
            .iter()
            .filter_map(|e| match &e.kind {
                EventKind::TaskProgress {
                    task_name: name,
                    phase,
                    progress,
                    ..
                } if name == task_name => Some((*phase, *progress)),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![(TaskPhase::Started, 0), (TaskPhase::Processing, 50), (TaskPhase::Completed, 100)]
        );
    }
}

#[tokio::test]
async fn test_failing_executor_fails_run_and_files_one_issue() {
    let (mut orch, _, telemetry, reporter) = orchestrator(
        ScriptedClient::new(CHAT_ROADMAP, Some("deliverables and documentation")),
        OrchestratorConfig::default(),
    );

    let err = orch.execute("Build a realtime chat application").await.unwrap_err();
    match &err {
        OrchestratorError::Executor { task_id, .. } => assert_eq!(task_id, "deliverables"),
        other => panic!("unexpected error: {other}"),
    }

    let requests = reporter.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].title, "[Blocker] Deliverables Definition failed during orchestration");
    assert!(requests[0].body.contains("model overloaded"));

    let snapshot = telemetry.metrics_snapshot();
    assert_eq!(snapshot.total_tasks_failed, 1);
    assert_eq!(snapshot.total_tasks_completed, 3);
}

#[tokio::test]
async fn test_degrade_policy_reports_failed_slot() {
    let config = OrchestratorConfig {
        failure_policy: FailurePolicy::Degrade,
        ..Default::default()
    };
    let (mut orch, _, _, reporter) =
        orchestrator(ScriptedClient::new(CHAT_ROADMAP, Some("technology stack specialist")), config);

    let report = orch.execute("Build a realtime chat application").await.unwrap();
    assert_eq!(report.summary.tasks_completed, 3);
    assert_eq!(report.agent_outputs.executors.len(), 4);
    assert!(!report.agent_outputs.executors[0].succeeded());
    assert!(report.agent_outputs.executors[1..].iter().all(|e| e.succeeded()));
    assert_eq!(reporter.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_planner_parse_error_keeps_raw_text() {
    let (mut orch, _, telemetry, _) = orchestrator(
        ScriptedClient::new("Sorry, I cannot produce JSON today.", None),
        OrchestratorConfig::default(),
    );

    let report = orch.execute("Build a realtime chat application").await.unwrap();
    let value = serde_json::to_value(&report.summary.project_roadmap).unwrap();
    assert_eq!(value, json!({ "raw": "Sorry, I cannot produce JSON today.", "parseError": true }));
    assert_eq!(report.summary.tasks_completed, 4);
    assert!(telemetry.metrics_snapshot().risk_events.is_empty());
}

#[tokio::test]
async fn test_report_json_round_trip() {
    let (mut orch, _, _, _) = orchestrator(ScriptedClient::new(CHAT_ROADMAP, None), OrchestratorConfig::default());
    let report = orch.execute("Build a realtime chat application").await.unwrap();

    let text = serde_json::to_string(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["metadata"]["architecture"], "Multi-Agent System");
    assert_eq!(value["summary"]["totalAgents"], 5);
    assert!(value["agentOutputs"]["executors"][0].get("error").is_none());

    let back: Report = serde_json::from_str(&text).unwrap();
    assert_eq!(back, report);
}

#[tokio::test]
async fn test_state_tracks_last_run() {
    let (mut orch, _, _, _) = orchestrator(ScriptedClient::new(CHAT_ROADMAP, None), OrchestratorConfig::default());
    assert!(orch.state().roadmap.is_none());

    orch.execute("first").await.unwrap();
    orch.execute("second").await.unwrap();

    let state = orch.state();
    assert!(state.roadmap.is_some());
    assert_eq!(state.allocations.len(), 4);
    assert_eq!(state.executions.len(), 4);
}

// =============================================================================
// HTTP provider
// =============================================================================

#[tokio::test]
async fn test_end_to_end_over_chat_completions() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("project planner"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": CHAT_ROADMAP } } ]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": "{\"done\": true}" } } ]
        })))
        .expect(4)
        .mount(&server)
        .await;

    // Gemini has no key, so every call falls back to the chat provider
    let providers = ProvidersConfig {
        gemini: GeminiConfig {
            api_key_env: "PF_TEST_UNSET_GEMINI_KEY".to_string(),
            ..Default::default()
        },
        llama: ChatProviderConfig {
            enabled: true,
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            endpoint_env: "PF_TEST_UNSET_LLAMA_ENDPOINT".to_string(),
            api_key_env: "PF_TEST_UNSET_LLAMA_KEY".to_string(),
            model_env: "PF_TEST_UNSET_LLAMA_MODEL".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    let mut orch = Orchestrator::new(
        Arc::new(ModelRouter::from_config(&providers)),
        Arc::new(TelemetryTracker::default()),
        OrchestratorConfig::default(),
    );
    let report = orch.execute("Build a realtime chat application").await.unwrap();

    assert_eq!(report.summary.tasks_completed, 4);
    assert!(!report.summary.project_roadmap.is_parse_error());
    assert!(
        report
            .agent_outputs
            .executors
            .iter()
            .all(|e| e.output == ModelJson::Parsed(json!({ "done": true })))
    );
}
