//! Telemetry Tracker - in-memory agent monitoring with listener fan-out
//!
//! One tracker is constructed per process and shared behind an `Arc`.
//! Synchronous listeners are called for every event outside the state lock;
//! async consumers can [`subscribe`](TelemetryTracker::subscribe) to a
//! broadcast channel instead.

use std::collections::{BTreeMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Duration, DurationRound, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::types::{
    AgentMetrics, EventKind, LoadBucket, MetricsSnapshot, RiskHeatmap, RiskStatus, TaskPhase, TelemetryEvent,
};
use crate::config::TelemetryConfig;

/// Broadcast channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

const SNAPSHOT_RECENT_EVENTS: usize = 50;
const SNAPSHOT_TIMELINE: usize = 100;
const SNAPSHOT_RISK_EVENTS: usize = 50;
const SNAPSHOT_REALLOCATIONS: usize = 20;

/// Synchronous telemetry listener
pub type Listener = Arc<dyn Fn(&TelemetryEvent) -> eyre::Result<()> + Send + Sync>;

#[derive(Default)]
struct TrackerState {
    events: VecDeque<TelemetryEvent>,
    /// Insertion order is the order agents were first seen
    agent_metrics: Vec<AgentMetrics>,
    task_timeline: VecDeque<TelemetryEvent>,
    risk_events: VecDeque<TelemetryEvent>,
    reallocations: VecDeque<TelemetryEvent>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

impl TrackerState {
    fn metrics_mut(&mut self, agent_name: &str) -> &mut AgentMetrics {
        let idx = match self.agent_metrics.iter().position(|m| m.name == agent_name) {
            Some(idx) => idx,
            None => {
                self.agent_metrics.push(AgentMetrics::new(agent_name));
                self.agent_metrics.len() - 1
            }
        };
        &mut self.agent_metrics[idx]
    }
}

fn push_capped(buf: &mut VecDeque<TelemetryEvent>, event: TelemetryEvent, cap: usize) {
    if cap == 0 {
        return;
    }
    while buf.len() >= cap {
        buf.pop_front();
    }
    buf.push_back(event);
}

fn tail(buf: &VecDeque<TelemetryEvent>, n: usize) -> Vec<TelemetryEvent> {
    buf.iter().skip(buf.len().saturating_sub(n)).cloned().collect()
}

/// Records agent activity, task progress, risks and reallocations
pub struct TelemetryTracker {
    config: TelemetryConfig,
    state: Mutex<TrackerState>,
    tx: broadcast::Sender<TelemetryEvent>,
}

impl TelemetryTracker {
    pub fn new(config: TelemetryConfig) -> Self {
        debug!(?config, "TelemetryTracker::new: called");
        let (tx, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            config,
            state: Mutex::new(TrackerState::default()),
            tx,
        }
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a synchronous listener
    ///
    /// The listener stays registered until the returned handle is
    /// unsubscribed; dropping the handle does not remove it.
    pub fn add_listener(
        self: &Arc<Self>,
        listener: impl Fn(&TelemetryEvent) -> eyre::Result<()> + Send + Sync + 'static,
    ) -> ListenerHandle {
        let mut state = self.state();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.push((id, Arc::new(listener)));
        debug!(id, listeners = state.listeners.len(), "add_listener: called");
        ListenerHandle {
            tracker: Arc::downgrade(self),
            id,
        }
    }

    fn remove_listener(&self, id: u64) -> bool {
        let mut state = self.state();
        let before = state.listeners.len();
        state.listeners.retain(|(lid, _)| *lid != id);
        debug!(id, removed = before != state.listeners.len(), "remove_listener: called");
        before != state.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        debug!("TelemetryTracker::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Deliver an event to every listener and subscriber
    ///
    /// A listener that errors or panics is logged and skipped; the others
    /// still receive the event.
    pub fn broadcast(&self, event: &TelemetryEvent) {
        let listeners: Vec<(u64, Listener)> = self.state().listeners.clone();
        debug!(event_type = event.event_type(), listeners = listeners.len(), "broadcast: called");

        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(id, error = %e, "Telemetry listener failed"),
                Err(_) => warn!(id, "Telemetry listener panicked"),
            }
        }

        // No subscribers is fine
        let _ = self.tx.send(event.clone());
    }

    fn record(&self, event: TelemetryEvent, apply: impl FnOnce(&mut TrackerState, &TelemetryEvent)) {
        {
            let mut state = self.state();
            apply(&mut *state, &event);
            push_capped(&mut state.events, event.clone(), self.config.max_events);
        }
        self.broadcast(&event);
    }

    pub fn track_agent_start(&self, agent_name: &str, task_id: &str, task_name: &str) {
        info!(%agent_name, %task_id, "Agent started");
        let event = TelemetryEvent::new(EventKind::AgentStart {
            agent_name: agent_name.to_string(),
            task_id: task_id.to_string(),
            task_name: task_name.to_string(),
        });
        self.record(event, |state, _| {
            let metrics = state.metrics_mut(agent_name);
            metrics.tasks_in_progress += 1;
            metrics.current_load = metrics.tasks_in_progress;
        });
    }

    pub fn track_agent_complete(&self, agent_name: &str, task_id: &str, task_name: &str, duration_ms: u64) {
        info!(%agent_name, %task_id, duration_ms, "Agent completed");
        let event = TelemetryEvent::new(EventKind::AgentComplete {
            agent_name: agent_name.to_string(),
            task_id: task_id.to_string(),
            task_name: task_name.to_string(),
            duration: duration_ms,
        });
        self.record(event, |state, _| {
            let metrics = state.metrics_mut(agent_name);
            metrics.tasks_in_progress = metrics.tasks_in_progress.saturating_sub(1);
            metrics.tasks_completed += 1;
            metrics.current_load = metrics.tasks_in_progress;
            metrics.total_processing_time += duration_ms;
            metrics.average_task_time = metrics.total_processing_time as f64 / metrics.tasks_completed as f64;
        });
    }

    pub fn track_agent_error(&self, agent_name: &str, task_id: &str, task_name: &str, error: &str) {
        warn!(%agent_name, %task_id, %error, "Agent failed");
        let event = TelemetryEvent::new(EventKind::AgentError {
            agent_name: agent_name.to_string(),
            task_id: task_id.to_string(),
            task_name: task_name.to_string(),
            error: error.to_string(),
        });
        self.record(event, |state, _| {
            let metrics = state.metrics_mut(agent_name);
            metrics.tasks_in_progress = metrics.tasks_in_progress.saturating_sub(1);
            metrics.tasks_failed += 1;
            metrics.current_load = metrics.tasks_in_progress;
        });
    }

    pub fn track_task_progress(&self, task_id: &str, task_name: &str, phase: TaskPhase, progress: u8, agent_name: &str) {
        debug!(%task_id, ?phase, progress, "track_task_progress: called");
        let event = TelemetryEvent::new(EventKind::TaskProgress {
            task_id: task_id.to_string(),
            task_name: task_name.to_string(),
            phase,
            progress: progress.min(100),
            agent_name: agent_name.to_string(),
        });
        let cap = self.config.max_timeline;
        self.record(event, |state, event| push_capped(&mut state.task_timeline, event.clone(), cap));
    }

    pub fn track_risk(&self, risk_id: &str, risk_name: &str, severity: &str, category: &str, status: RiskStatus) {
        debug!(%risk_id, %severity, %category, "track_risk: called");
        let event = TelemetryEvent::new(EventKind::RiskEvent {
            risk_id: risk_id.to_string(),
            risk_name: risk_name.to_string(),
            severity: severity.to_string(),
            category: category.to_string(),
            status,
        });
        let cap = self.config.max_risk_events;
        self.record(event, |state, event| push_capped(&mut state.risk_events, event.clone(), cap));
    }

    pub fn track_reallocation(&self, task_id: &str, task_name: &str, from_agent: &str, to_agent: &str, reason: &str) {
        info!(%task_id, %from_agent, %to_agent, %reason, "Task reallocated");
        let event = TelemetryEvent::new(EventKind::Reallocation {
            task_id: task_id.to_string(),
            task_name: task_name.to_string(),
            from_agent: from_agent.to_string(),
            to_agent: to_agent.to_string(),
            reason: reason.to_string(),
        });
        let cap = self.config.max_reallocations;
        self.record(event, |state, event| push_capped(&mut state.reallocations, event.clone(), cap));
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        debug!("metrics_snapshot: called");
        let state = self.state();
        let agents = state.agent_metrics.clone();
        MetricsSnapshot {
            timestamp: Utc::now(),
            total_tasks_completed: agents.iter().map(|a| a.tasks_completed).sum(),
            total_tasks_in_progress: agents.iter().map(|a| a.tasks_in_progress).sum(),
            total_tasks_failed: agents.iter().map(|a| a.tasks_failed).sum(),
            agent_metrics: agents,
            recent_events: tail(&state.events, SNAPSHOT_RECENT_EVENTS),
            task_timeline: tail(&state.task_timeline, SNAPSHOT_TIMELINE),
            risk_events: tail(&state.risk_events, SNAPSHOT_RISK_EVENTS),
            reallocation_events: tail(&state.reallocations, SNAPSHOT_REALLOCATIONS),
        }
    }

    /// Per-agent load in one-minute buckets over the trailing window
    ///
    /// Within a bucket each agent starts at zero; starts add one, completions
    /// and errors subtract one without going below zero.
    pub fn agent_load_history(&self, minutes: i64) -> Vec<LoadBucket> {
        debug!(minutes, "agent_load_history: called");
        let cutoff = Utc::now() - Duration::minutes(minutes);
        let state = self.state();
        let mut buckets: BTreeMap<DateTime<Utc>, BTreeMap<String, u64>> = BTreeMap::new();

        for event in state.events.iter().filter(|e| e.timestamp > cutoff) {
            let Some(agent) = event.agent_name() else {
                continue;
            };
            let bucket = event.timestamp.duration_trunc(Duration::minutes(1)).unwrap_or(event.timestamp);
            let load = buckets.entry(bucket).or_default().entry(agent.to_string()).or_insert(0);
            match event.kind {
                EventKind::AgentStart { .. } => *load += 1,
                EventKind::AgentComplete { .. } | EventKind::AgentError { .. } => *load = load.saturating_sub(1),
                _ => {}
            }
        }

        buckets.into_iter().map(|(time, loads)| LoadBucket { time, loads }).collect()
    }

    /// Risk counts over the retained risk events
    pub fn risk_heatmap(&self) -> RiskHeatmap {
        debug!("risk_heatmap: called");
        let state = self.state();
        let mut heatmap = RiskHeatmap::default();
        for event in &state.risk_events {
            if let EventKind::RiskEvent { category, severity, .. } = &event.kind {
                heatmap.record(category, severity);
            }
        }
        heatmap
    }

    /// Clear all history and metrics; listeners stay registered
    pub fn reset(&self) {
        debug!("TelemetryTracker::reset: called");
        let mut state = self.state();
        state.events.clear();
        state.agent_metrics.clear();
        state.task_timeline.clear();
        state.risk_events.clear();
        state.reallocations.clear();
    }
}

impl Default for TelemetryTracker {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

/// Registration of a listener on a [`TelemetryTracker`]
#[derive(Debug)]
pub struct ListenerHandle {
    tracker: Weak<TelemetryTracker>,
    id: u64,
}

impl ListenerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving events; false when already gone
    pub fn unsubscribe(self) -> bool {
        match self.tracker.upgrade() {
            Some(tracker) => tracker.remove_listener(self.id),
            None => false,
        }
    }
}
